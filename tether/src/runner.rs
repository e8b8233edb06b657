//! Runs a sequence of episodes over one session.
use anyhow::Result;
use log::{debug, info};
use tether_core::{
    episode_reports_fmt, record::Recorder, Channel, Env, EpisodeConfig, EpisodeController,
    EpisodeReport,
};

/// Runs `n_episodes` episodes of `E` over `channel`.
///
/// A fresh environment is built for every episode with seed `seed + ix` (wrapping), so
/// the sequence is reproducible and episodes do not share environment state.
/// Failed episodes are reported, not returned as errors. An error is returned
/// only if an environment cannot be built.
pub fn run_episodes<E, C, R>(
    env_config: &E::Config,
    seed: i64,
    n_episodes: usize,
    channel: &C,
    episode_config: &EpisodeConfig,
    recorder: &mut R,
) -> Result<Vec<EpisodeReport>>
where
    E: Env,
    C: Channel + ?Sized,
    R: Recorder,
{
    let mut reports = Vec::with_capacity(n_episodes);

    for ix in 0..n_episodes {
        let env = E::build(env_config, seed.wrapping_add(ix as i64))?;
        let report = EpisodeController::new(episode_config.clone(), env, channel)
            .episode(ix)
            .run(&mut *recorder);
        debug!("{}", report.fmt());
        reports.push(report);
    }

    info!("Finished {} episodes\n{}", n_episodes, episode_reports_fmt(&reports));
    Ok(reports)
}

#[cfg(test)]
mod test {
    use super::*;
    use tether_core::{
        dummy::{ScriptedChannel, ScriptedEnv, ScriptedEnvConfig, ScriptedStep},
        record::BufferedRecorder,
        Codec, EpisodeOutcome, NdArrayCodec,
    };

    #[test]
    fn test_run_episodes_builds_env_per_episode() -> Result<()> {
        let env_config = ScriptedEnvConfig::new(vec![
            ScriptedStep::running(1.0),
            ScriptedStep::terminated(0.5),
        ]);
        let act = NdArrayCodec::default().encode(&ScriptedEnv::act(0.0))?;
        let channel = ScriptedChannel::new()
            .on_publish(move |_, _| vec![("simulation/action_space".to_string(), act.clone())]);
        let config = EpisodeConfig::default().poll_interval_ms(0).settle_ms(0);
        let mut recorder = BufferedRecorder::new();

        let reports =
            run_episodes::<ScriptedEnv, _, _>(&env_config, 0, 3, &channel, &config, &mut recorder)?;

        assert_eq!(reports.len(), 3);
        for (ix, report) in reports.iter().enumerate() {
            assert_eq!(report.episode, ix);
            assert_eq!(report.outcome, EpisodeOutcome::Terminated);
            assert_eq!(report.total_reward, 1.5);
        }
        // Two step records and a summary per episode.
        assert_eq!(recorder.len(), 9);
        assert_eq!(env_config.log.applied().len(), 6);
        Ok(())
    }

    #[test]
    fn test_run_episodes_seed_wraps_around() -> Result<()> {
        let env_config = ScriptedEnvConfig::new(vec![ScriptedStep::truncated(1.0)]);
        let act = NdArrayCodec::default().encode(&ScriptedEnv::act(0.0))?;
        let channel = ScriptedChannel::new()
            .on_publish(move |_, _| vec![("simulation/action_space".to_string(), act.clone())]);
        let config = EpisodeConfig::default().poll_interval_ms(0).settle_ms(0);

        let reports = run_episodes::<ScriptedEnv, _, _>(
            &env_config,
            i64::MAX,
            2,
            &channel,
            &config,
            &mut BufferedRecorder::new(),
        )?;

        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|r| r.outcome == EpisodeOutcome::Truncated));
        Ok(())
    }
}

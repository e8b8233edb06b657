use super::PendulumConfig;
use anyhow::{bail, Result};
use log::{info, trace};
use ndarray::arr1;
use tether_core::{
    record::{Record, RecordValue},
    Act, DType, Env, NdArray, Obs, Step, TetherError,
};

/// Observation of [`Pendulum`].
#[derive(Clone, Debug, PartialEq)]
pub struct PendulumObs(pub [f64; 4]);

impl PendulumObs {
    /// Position of the cart.
    pub fn position(&self) -> f64 {
        self.0[0]
    }

    /// Angle of the pole, zero when upright.
    pub fn angle(&self) -> f64 {
        self.0[1]
    }

    /// Velocity of the cart.
    pub fn velocity(&self) -> f64 {
        self.0[2]
    }

    /// Angular velocity of the pole.
    pub fn angular_velocity(&self) -> f64 {
        self.0[3]
    }

    /// Reads an observation from its array representation.
    pub fn from_array(array: &NdArray) -> Result<Self, TetherError> {
        let v = match array {
            NdArray::F64(_) | NdArray::F32(_) if array.shape() == &[4] => array.to_f64_vec(),
            _ => {
                return Err(TetherError::MalformedPayload(format!(
                    "expected a pendulum observation, got {}{:?}",
                    array.dtype(),
                    array.shape()
                )))
            }
        };
        Ok(Self([v[0], v[1], v[2], v[3]]))
    }
}

impl Obs for PendulumObs {
    fn to_array(&self) -> NdArray {
        NdArray::F64(arr1(&self.0).into_dyn())
    }
}

/// Action of [`Pendulum`], the motor command applied to the cart.
#[derive(Clone, Debug, PartialEq)]
pub struct PendulumAct(pub f64);

impl Act for PendulumAct {
    fn from_array(array: NdArray) -> Result<Self, TetherError> {
        match array.dtype() {
            DType::F32 => array.expect(DType::F32, &[1])?,
            _ => array.expect(DType::F64, &[1])?,
        }
        let v = array.to_f64_vec()[0];
        if !v.is_finite() {
            return Err(TetherError::InvalidAction(format!("non-finite action {}", v)));
        }
        Ok(Self(v))
    }
}

impl From<PendulumAct> for NdArray {
    fn from(act: PendulumAct) -> Self {
        NdArray::F64(arr1(&[act.0]).into_dyn())
    }
}

/// A damped inverted pendulum on a cart.
///
/// The dynamics are integrated with semi-implicit Euler steps. The pole angle
/// is measured from the upright position, positive when the pole leans
/// towards the positive direction of the rail, which is also the direction of
/// a positive action.
pub struct Pendulum {
    config: PendulumConfig,
    rng: fastrand::Rng,
    state: [f64; 4],
    n_steps: usize,
}

impl Pendulum {
    fn obs(&self) -> PendulumObs {
        PendulumObs(self.state)
    }

    fn integrate(&mut self, action: f64) {
        let c = &self.config;
        let [x, theta, x_dot, theta_dot] = self.state;
        let (sin, cos) = theta.sin_cos();
        let total_mass = c.cart_mass + c.pole_mass;
        let pole_mass_length = c.pole_mass * c.half_length;

        let force = c.gear * action.clamp(-c.max_action, c.max_action) - c.cart_damping * x_dot;
        let temp = (force + pole_mass_length * theta_dot * theta_dot * sin) / total_mass;
        let theta_acc = (c.gravity * sin - cos * temp)
            / (c.half_length * (4.0 / 3.0 - c.pole_mass * cos * cos / total_mass))
            - c.pole_damping * theta_dot;
        let x_acc = temp - pole_mass_length * theta_acc * cos / total_mass;

        let mut x_dot = x_dot + c.dt * x_acc;
        let mut x = x + c.dt * x_dot;
        let theta_dot = theta_dot + c.dt * theta_acc;
        let theta = theta + c.dt * theta_dot;

        // End of the rail
        if x.abs() > c.max_position {
            x = c.max_position.copysign(x);
            x_dot = 0.0;
        }

        self.state = [x, theta, x_dot, theta_dot];
    }
}

impl Env for Pendulum {
    type Config = PendulumConfig;
    type Obs = PendulumObs;
    type Act = PendulumAct;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        if config.dt <= 0.0 || config.cart_mass <= 0.0 || config.pole_mass <= 0.0 {
            bail!("dt and masses of the pendulum must be positive");
        }
        if config.half_length <= 0.0 {
            bail!("length of the pole must be positive");
        }
        info!("Build pendulum with seed {}", seed);

        Ok(Self {
            config: config.clone(),
            rng: fastrand::Rng::with_seed(seed as u64),
            state: [0.0; 4],
            n_steps: 0,
        })
    }

    fn reset(&mut self) -> Result<PendulumObs> {
        let noise = self.config.init_noise;
        for v in self.state.iter_mut() {
            *v = noise * (2.0 * self.rng.f64() - 1.0);
        }
        self.n_steps = 0;
        Ok(self.obs())
    }

    fn step(&mut self, a: &PendulumAct) -> Result<(Step<Self>, Record), TetherError> {
        self.integrate(a.0);
        self.n_steps += 1;

        let obs = self.obs();
        if obs.0.iter().any(|v| !v.is_finite()) {
            return Err(TetherError::EnvironmentFault(format!(
                "non-finite state {:?} at step {}",
                obs.0, self.n_steps
            )));
        }
        let is_terminated = obs.angle().abs() > self.config.healthy_angle;
        let is_truncated = !is_terminated && self.n_steps >= self.config.max_steps;
        let reward = if is_terminated { 0.0 } else { 1.0 };
        trace!("Step {}: {:?}", self.n_steps, obs.0);

        let record = Record::from_slice(&[
            ("action", RecordValue::Scalar(a.0 as f32)),
            ("position", RecordValue::Scalar(obs.position() as f32)),
            ("angle", RecordValue::Scalar(obs.angle() as f32)),
        ]);
        let step = Step::new(obs, a.clone(), reward, is_terminated, is_truncated, ());

        Ok((step, record))
    }
}

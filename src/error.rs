//! Error types.
//!
//! Two layers:
//!
//! - [`SimError`]: domain failures raised by the sampler, simulators and the GLM
//!   fitter. These carry no process-level meaning.
//! - [`AppError`]: what the binary reports. It carries an exit code so `main`
//!   stays a one-liner.
//!
//! Exit codes: `2` bad input or I/O, `3` nothing left to fit, `4` numerical failure.

/// Domain-level failure.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A probability, survival rate, age bound or anchor sequence is out of range.
    InvalidParameter(String),
    /// Lifespan filtering removed every sampled individual.
    EmptyPopulation,
    /// The GLM could not be fitted (singular design, non-finite estimates).
    FitFailed(String),
}

impl SimError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SimError::InvalidParameter(message.into())
    }
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            SimError::EmptyPopulation => write!(
                f,
                "Empty population: no sampled lifespan fell inside the age bounds."
            ),
            SimError::FitFailed(msg) => write!(f, "Model fit failed: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SimError> for AppError {
    fn from(err: SimError) -> Self {
        let code = match err {
            SimError::InvalidParameter(_) => 2,
            SimError::EmptyPopulation => 3,
            SimError::FitFailed(_) => 4,
        };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

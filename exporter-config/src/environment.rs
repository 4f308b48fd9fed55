use std::fmt;
use std::io;
use std::str::FromStr;

/// Variable selecting which configuration file is layered over `base`.
const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";

/// Deployment the exporter runs in. Picks `configuration/<name>.yaml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    /// Local runs against a development database, without probe or combine pauses.
    #[default]
    Dev,
    /// Runs against the production source with TLS and rate-limit pauses.
    Prod,
}

impl Environment {
    const ALL: [Environment; 2] = [Environment::Dev, Environment::Prod];

    /// Reads `APP_ENVIRONMENT`. An unset variable selects [`Environment::Dev`].
    pub fn load() -> Result<Environment, io::Error> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Environment::default()),
        }
    }

    /// Stem of the configuration file for this environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|environment| environment.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unknown {ENVIRONMENT_VAR} `{wanted}`, expected `dev` or `prod`"),
                )
            })
    }
}

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::from_environment(::config::Environment::default())
    }

    fn from_environment(environment: ::config::Environment) -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

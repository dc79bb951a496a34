//! Configuration command

use crate::app::{ConfigAction, ConfigArgs};
use paperscout_core::{Config, PaperScoutError};

pub fn run(args: ConfigArgs) -> Result<(), PaperScoutError> {
    match args.action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", serde_yaml::to_string(&config)?);
        }
        ConfigAction::Init => {
            let path = Config::default_path();
            if path.exists() {
                return Err(PaperScoutError::Config(format!(
                    "configuration file already exists at {}",
                    path.display()
                )));
            }
            Config::default().save()?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::default_path().display());
        }
    }
    Ok(())
}

use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use crate::error::Error;

#[derive(StructOpt, Debug, Clone)]
#[structopt(name = "ancs4shell", about = "Runs shell handlers for iPhone notifications")]
pub struct Opt {
    #[structopt(long, default_value = "0", help = "Use Bluetooth hciX (see `hcitool dev`)")]
    pub hci: usize,
    #[structopt(long, default_value = "20", help = "Polling rate, per second")]
    pub resolution: u32,
    #[structopt(long, help = "Poll characteristic values instead of waiting for change signals")]
    pub poll: bool,
    #[structopt(
        long,
        parse(from_os_str),
        default_value = "handlers/notification.sh",
        help = "Run with <title> <app id> <message> for every notification"
    )]
    pub notification_handler: PathBuf,
    #[structopt(
        long,
        parse(from_os_str),
        default_value = "handlers/battery.sh",
        help = "Run with <percentage> when the phone battery level changes"
    )]
    pub battery_handler: PathBuf,
}

impl Opt {
    pub fn validate(&self) -> Result<(), Error> {
        if self.resolution == 0 {
            return Err(Error::Config("--resolution must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn adapter_path(&self) -> String {
        adapter_path(self.hci)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.resolution.max(1)))
    }
}

pub fn adapter_path(hci: usize) -> String {
    format!("/org/bluez/hci{}", hci)
}

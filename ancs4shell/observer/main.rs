use std::process::ExitCode;

use env_logger::Env;
use log::{error, info};
use structopt::StructOpt;

use ancs4shell::common::apis::ShellHandlers;
use ancs4shell::common::config::Opt;
use ancs4shell::common::dbus::SystemBus;
use ancs4shell::common::external_apis::BluezProvider;
use ancs4shell::observer::bridge::Bridge;
use ancs4shell::observer::discovery::discover;
use ancs4shell::Error;

async fn run(opt: Opt) -> Result<(), Error> {
    opt.validate()?;
    let bus = SystemBus::new().await?;
    let provider = BluezProvider::new(bus.connection().clone());

    let handles = discover(&provider, opt.hci).await?;
    let sink = ShellHandlers::new(opt.notification_handler.clone(), opt.battery_handler.clone());
    let mut bridge = Bridge::new(provider, sink, handles);
    bridge.start().await?;

    if opt.poll {
        bridge.run_polling(opt.poll_period()).await
    } else {
        bridge.run_watching().await
    }
}

fn finished(result: Result<(), Error>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn interrupted(signal: std::io::Result<()>) -> ExitCode {
    match signal {
        Ok(()) => {
            info!("Interrupted, exiting.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Cannot listen for Ctrl-C: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opt = Opt::from_args();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    tokio::select! {
        result = run(opt) => finished(result),
        signal = tokio::signal::ctrl_c() => interrupted(signal),
    }
}

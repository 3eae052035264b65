use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use tokio::time::{interval, MissedTickBehavior};

use crate::common::apis::ActionSink;
use crate::common::external_apis::{GattProvider, Sample};
use crate::error::Error;
use crate::observer::discovery::AncsHandles;
use crate::observer::session::NotificationSession;

/// Last observed value of every watched source.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LastValues {
    notification_source: Option<Vec<u8>>,
    data_source: Option<Vec<u8>>,
    battery: Option<u8>,
}

impl LastValues {
    /// Records `sample`, returning whether it differs from the previous value
    /// of the same source. The first value of a source is never a change.
    pub fn update(&mut self, sample: &Sample) -> bool {
        fn replace<T: PartialEq + Clone>(slot: &mut Option<T>, value: &T) -> bool {
            match slot {
                Some(last) if last == value => false,
                Some(last) => {
                    *last = value.clone();
                    true
                }
                None => {
                    *slot = Some(value.clone());
                    false
                }
            }
        }
        match sample {
            Sample::NotificationSource(value) => replace(&mut self.notification_source, value),
            Sample::DataSource(value) => replace(&mut self.data_source, value),
            Sample::Battery(value) => replace(&mut self.battery, value),
        }
    }
}

/// Process-wide context: one phone, one session, one sink.
pub struct Bridge<P, S> {
    provider: P,
    sink: S,
    session: NotificationSession,
    battery: Option<String>,
    last: LastValues,
}

impl<P: GattProvider, S: ActionSink> Bridge<P, S> {
    pub fn new(provider: P, sink: S, handles: AncsHandles) -> Self {
        Self {
            provider,
            sink,
            session: NotificationSession::new(handles),
            battery: None,
            last: LastValues::default(),
        }
    }

    /// Subscribes to both characteristics and records their current values,
    /// and the battery level, as the baseline.
    pub async fn start(&mut self) -> Result<(), Error> {
        let handles = self.session.handles().clone();
        self.provider
            .start_notify(&handles.notification_source)
            .await?;
        self.provider.start_notify(&handles.data_source).await?;

        if self.provider.has_battery(&handles.device).await? {
            self.battery = Some(handles.device.clone());
        } else {
            info!("{} reports no battery level, not watching it", handles.device);
        }

        for sample in self.sample().await? {
            self.last.update(&sample);
        }
        Ok(())
    }

    async fn sample(&self) -> Result<Vec<Sample>, Error> {
        let handles = self.session.handles();
        if !self.provider.is_connected(&handles.device).await? {
            return Err(Error::Disconnected(handles.device.clone()));
        }
        let mut samples = vec![
            Sample::NotificationSource(
                self.provider
                    .read_value(&handles.notification_source)
                    .await?,
            ),
            Sample::DataSource(self.provider.read_value(&handles.data_source).await?),
        ];
        if let Some(device) = &self.battery {
            samples.push(Sample::Battery(
                self.provider.battery_percentage(device).await?,
            ));
        }
        Ok(samples)
    }

    /// Reads every source once and dispatches the ones that changed.
    /// Returns the number of dispatches.
    pub async fn tick(&mut self) -> Result<usize, Error> {
        let mut dispatched = 0;
        for sample in self.sample().await? {
            if self.observe(sample).await? {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Dispatches `sample` if it differs from the last value of its source.
    pub async fn observe(&mut self, sample: Sample) -> Result<bool, Error> {
        if !self.last.update(&sample) {
            return Ok(false);
        }
        self.dispatch(sample).await?;
        Ok(true)
    }

    async fn dispatch(&mut self, sample: Sample) -> Result<(), Error> {
        match sample {
            Sample::NotificationSource(value) => {
                self.session
                    .on_notification_source(&self.provider, &value)
                    .await?;
            }
            Sample::DataSource(value) => {
                if let Some(notification) = self.session.on_data_source(&value) {
                    self.sink.on_notification(&notification);
                }
            }
            Sample::Battery(percentage) => {
                info!("Battery is at {} percent", percentage);
                self.sink.on_battery_change(percentage);
            }
        }
        Ok(())
    }

    /// Reads all sources every `period` until a read or write fails.
    pub async fn run_polling(&mut self, period: Duration) -> Result<(), Error> {
        info!("Polling every {:?}...", period);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.tick().await?;
        }
    }

    /// Handles values as the provider pushes them, until the stream ends or
    /// fails.
    pub async fn run_watching(&mut self) -> Result<(), Error> {
        let handles = self.session.handles().clone();
        let mut changes = self
            .provider
            .watch(
                &handles.device,
                &handles.notification_source,
                &handles.data_source,
                self.battery.is_some(),
            )
            .await?;
        // Catch up on anything that changed between the baseline and the
        // subscription.
        let missed = self.tick().await?;
        if missed > 0 {
            debug!("{} change(s) arrived before the subscription", missed);
        }
        info!("Waiting for notifications...");
        while let Some(sample) = changes.next().await {
            self.observe(sample?).await?;
        }
        warn!("Value change stream ended");
        debug!("Stopped watching {}", handles.device);
        Ok(())
    }
}

use tracing::{debug, info};

use crate::engine::{EngineFactory, TransferEngine};
use crate::error::{Error, Result};
use crate::types::{
    ActivePort, AuthMethod, Credentials, DEFAULT_TIMEOUT, SecurityLevel, TransferOption,
};

/// Owns one transfer engine and hands it out freshly configured
///
/// The engine is created on the first [`acquire`](Self::acquire) and reused
/// afterwards. Every acquire wipes whatever the previous operation set and
/// reapplies the baseline, so operations never see each other's options.
pub struct TransportHandle<E: TransferEngine> {
    credentials: Credentials,
    port: u16,
    passive_mode: bool,
    factory: EngineFactory<E>,
    engine: Option<E>,
}

impl<E: TransferEngine> TransportHandle<E> {
    pub fn new(
        credentials: Credentials,
        port: u16,
        passive_mode: bool,
        factory: EngineFactory<E>,
    ) -> Self {
        Self {
            credentials,
            port,
            passive_mode,
            factory,
            engine: None,
        }
    }

    /// Returns the engine with per-call state cleared and the baseline applied
    ///
    /// # Errors
    ///
    /// - [`Error::Initialization`] if the engine cannot be created
    /// - [`Error::Configuration`] naming the first option the engine rejects
    pub fn acquire(&mut self) -> Result<&mut E> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                debug!("Creating transfer engine");
                (self.factory)().map_err(|e| Error::Initialization(e.to_string()))?
            }
        };
        let baseline = self.baseline();
        let engine = self.engine.insert(engine);

        if !engine.reset() {
            for option in per_call_defaults() {
                let name = option.name();
                engine
                    .set_option(option)
                    .map_err(|e| Error::configuration(name, e))?;
            }
        }

        for option in baseline {
            let name = option.name();
            engine
                .set_option(option)
                .map_err(|e| Error::configuration(name, e))?;
        }
        Ok(engine)
    }

    /// The fixed option set every operation starts from
    fn baseline(&self) -> Vec<TransferOption> {
        let mut options = vec![
            TransferOption::Credentials(self.credentials.clone()),
            TransferOption::VerifyPeer(false),
            TransferOption::VerifyHost(false),
            TransferOption::Security(SecurityLevel::All),
            TransferOption::Auth(AuthMethod::Default),
            TransferOption::Upload(true),
            TransferOption::Port(self.port),
            TransferOption::Timeout(DEFAULT_TIMEOUT),
            TransferOption::ReturnTransfer(true),
        ];
        if !self.passive_mode {
            options.push(TransferOption::ActivePort(Some(ActivePort::Auto)));
        }
        options
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Releases the engine. Close errors are dropped; there is nothing left
    /// to report them to.
    pub fn close(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            info!("Closing transfer engine");
            let _ = engine.close();
        }
    }
}

impl<E: TransferEngine> Drop for TransportHandle<E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Options an operation may set, at their cleared values
fn per_call_defaults() -> Vec<TransferOption> {
    vec![
        TransferOption::Url(None),
        TransferOption::InFileSize(0),
        TransferOption::ListOnly(false),
        TransferOption::Upload(false),
        TransferOption::Header(false),
        TransferOption::NoBody(false),
        TransferOption::Quote(Vec::new()),
        TransferOption::ReadFrom(None),
        TransferOption::WriteTo(None),
    ]
}

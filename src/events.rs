use std::io;
use std::sync::mpsc;
use std::thread;

use nix::sys::signal::SigSet;
use unsegen::input::Input;

use crate::calendar::DayKey;
use crate::config::Config;
use crate::index::AssetDateIndex;
use crate::provider::{AssetId, AuthorizationStatus, Result, Thumbnail};

pub enum Event {
    Input(Input),
    Update,
    /// The terminal window changed its size.
    Resize,
    AuthorizationChanged(AuthorizationStatus),
    AssetsFetched {
        index: Result<AssetDateIndex>,
        status: AuthorizationStatus,
    },
    ThumbnailLoaded {
        day: DayKey,
        asset: AssetId,
        image: Option<Thumbnail>,
    },
    ExternalModification,
}

/// Funnels input, ticks, signals and results of background work into the
/// UI thread.
pub struct Dispatcher {
    rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    _input_handle: Option<thread::JoinHandle<()>>,
    _update_handle: Option<thread::JoinHandle<()>>,
    _signal_handle: Option<thread::JoinHandle<()>>,
}

impl Default for Dispatcher {
    fn default() -> Dispatcher {
        Dispatcher::from_config(&Config::default(), SigSet::empty())
    }
}

impl Dispatcher {
    /// Queue without input, tick or signal threads.
    pub fn detached() -> Dispatcher {
        let (tx, rx) = mpsc::channel();
        Dispatcher {
            rx,
            tx,
            _input_handle: None,
            _update_handle: None,
            _signal_handle: None,
        }
    }

    /// `signals` are blocked for the calling thread and every thread spawned
    /// after it, and turn into `Event::Resize`. Call this before starting
    /// other threads.
    pub fn from_config(config: &Config, signals: SigSet) -> Dispatcher {
        let tick_rate = config.tick_rate;
        let (tx, rx) = mpsc::channel();

        // before spawning, so that no thread takes the signals away from `wait`
        let blocked = signals.thread_block();

        let input_handle = {
            let tx = tx.clone();
            thread::spawn(move || {
                let stdin = io::stdin();
                let stdin = stdin.lock();
                for input in Input::read_all(stdin) {
                    match input {
                        Ok(input) => {
                            if tx.send(Event::Input(input)).is_err() {
                                return;
                            }
                        }
                        Err(e) => log::warn!("Could not read input: {}", e),
                    }
                }
            })
        };
        let tx_upd = tx.clone();
        let update_handle = thread::spawn(move || loop {
            if tx_upd.send(Event::Update).is_err() {
                return;
            }
            thread::sleep(tick_rate);
        });

        let signal_handle = match blocked {
            Ok(()) => {
                let tx_sig = tx.clone();
                Some(thread::spawn(move || loop {
                    match signals.wait() {
                        Ok(signal) => {
                            log::trace!("Received {:?}", signal);
                            if tx_sig.send(Event::Resize).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            log::warn!("Could not wait for signals: {}", e);
                            return;
                        }
                    }
                }))
            }
            Err(e) => {
                log::warn!("Could not block signals: {}", e);
                None
            }
        };

        Dispatcher {
            rx,
            tx,
            _input_handle: Some(input_handle),
            _update_handle: Some(update_handle),
            _signal_handle: signal_handle,
        }
    }

    pub fn next(&self) -> std::result::Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }

    /// Next event if one is queued already.
    pub fn try_next(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    pub fn event_sink(&self) -> &mpsc::Sender<Event> {
        &self.tx
    }
}

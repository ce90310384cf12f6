extern crate pictocal as lib;

use flexi_logger::{FileSpec, Logger};
use lib::calendar::YearMonth;
use lib::events::Dispatcher;
use lib::provider::{DirectoryLibrary, ImageThumbnailer};
use lib::ui::{App, Theme};
use nix::sys::{signal, termios};
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use unsegen::base::Terminal;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "pictocal",
    about = "PictoCal - browse your photos on a month calendar."
)]
pub struct Args {
    #[structopt(
        name = "LIBRARY",
        help = "directory to read photos from",
        parse(from_os_str)
    )]
    pub library: Option<PathBuf>,

    #[structopt(
        name = "CONFIG",
        short = "c",
        long = "config",
        help = "path to config file",
        parse(from_os_str)
    )]
    pub configfile: Option<PathBuf>,

    #[structopt(
        short = "s",
        long = "show",
        help = "only print the month non-interactively"
    )]
    pub show: bool,

    #[structopt(short = "m", long = "month", help = "month to start with (YYYY-MM)")]
    pub month: Option<YearMonth>,

    #[structopt(long = "plain", help = "disable colors")]
    pub plain: bool,

    #[structopt(long = "log-file", help = "path to log file", parse(from_os_str))]
    pub log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::from_args();

    const DEFAULT_LOG_LEVEL: &str = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let mut logger = Logger::try_with_env_or_str(DEFAULT_LOG_LEVEL)?;

    if let Some(log_file) = &args.log_file {
        logger = logger
            .log_to_file(FileSpec::try_from(log_file)?)
            .print_message();
    } else if !args.show {
        // stderr would garble the alternate screen
        logger = logger.do_not_log();
    }

    logger.start()?;

    let mut config = lib::config::load_suitable_config(args.configfile.as_deref())?;
    if let Some(path) = args.library {
        config.library.path = path;
    }

    let library = Arc::new(DirectoryLibrary::from_config(
        &config.library,
        config.calendar.tz.clone(),
    ));
    let thumbnailer = Arc::new(ImageThumbnailer);

    let theme = if args.plain || args.show {
        Theme::plain()
    } else {
        Theme::default()
    };

    if args.show {
        let dispatcher = Dispatcher::detached();
        let mut app = App::new(&config, library, thumbnailer, &dispatcher).with_theme(theme);
        if let Some(month) = args.month {
            app.state_mut().set_current_month(month);
        }

        let stdout = stdout();
        let mut out = stdout.lock();
        app.show(&dispatcher, &mut out)?;
        return Ok(());
    }

    const STDIN: std::os::unix::io::RawFd = 0;
    let orig_attr = std::sync::Mutex::new(termios::tcgetattr(STDIN)?);

    std::panic::set_hook(Box::new(move |info| {
        // Switch to main terminal screen
        println!("{}{}", termion::screen::ToMainScreen, termion::cursor::Show);

        if let Ok(attr) = orig_attr.lock() {
            let _ = termios::tcsetattr(STDIN, termios::SetArg::TCSANOW, &attr);
        }

        println!("PictoCal ran into a fatal error!");
        println!("Consider filing an issue with a log file and the backtrace below.");

        println!("{}", info);
        println!("{:?}", backtrace::Backtrace::new());
    }));

    let mut signals_to_wait = signal::SigSet::empty();
    signals_to_wait.add(signal::SIGWINCH);

    let dispatcher = Dispatcher::from_config(&config, signals_to_wait);

    let _watcher = match library.watch(dispatcher.event_sink().clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::warn!("Not watching '{}': {}", library.root().display(), e);
            None
        }
    };

    let mut app = App::new(&config, library.clone(), thumbnailer, &dispatcher).with_theme(theme);
    if let Some(month) = args.month {
        app.state_mut().set_current_month(month);
    }

    // Setup unsegen terminal
    let stdout = stdout();
    let term = Terminal::new(stdout.lock())?;

    app.run(dispatcher, term)?;
    Ok(())
}

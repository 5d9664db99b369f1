use std::path::Path;

use color_eyre::{
    config::{HookBuilder, Theme},
    eyre::{self, Context},
};
use fern_format::{Format, Stream};

/// Installs color-eyre as the error report handler. Panics are printed to stderr and
/// also sent to the logger, so they end up in the log file if there is one.
pub fn init_eyre() -> eyre::Result<()> {
    let theme = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        Theme::dark()
    } else {
        Theme::new()
    };

    let (stderr_panic_hook, eyre_hook) = HookBuilder::default()
        .theme(theme)
        .display_env_section(false)
        .into_hooks();
    eyre_hook
        .install()
        .wrap_err("failed to install eyre hook")?;

    let (log_panic_hook, _) = HookBuilder::default().theme(Theme::new()).into_hooks();

    std::panic::set_hook(Box::new(move |info| {
        eprintln!("{}", stderr_panic_hook.panic_report(info));
        log::error!(target: "panic", "{}", log_panic_hook.panic_report(info));
    }));

    Ok(())
}

/// Maps the number of `-v` flags to a level. Zero means info.
pub fn verbosity_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Logs to stdout at `level`, and everything to `logfile` if given.
pub fn init_logger(logfile: Option<&Path>, level: log::LevelFilter) -> eyre::Result<()> {
    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Trace).chain(
        fern::Dispatch::new()
            .level(level)
            .format(
                Format::new()
                    .color_if_supported(Stream::Stdout)
                    .uniquely_color_threads()
                    .callback(),
            )
            .chain(std::io::stdout()),
    );

    if let Some(logfile) = logfile {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(Format::new().thread_names().callback())
                .chain(fern::log_file(logfile).wrap_err_with(|| {
                    format!("failed to open the log file at: {logfile:?}")
                })?),
        );
    }

    dispatch.apply().wrap_err("failed to set the logger")?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn more_flags_more_logs() {
        assert_eq!(log::LevelFilter::Info, verbosity_level(0));
        assert_eq!(log::LevelFilter::Debug, verbosity_level(1));
        assert_eq!(log::LevelFilter::Trace, verbosity_level(2));
        assert_eq!(log::LevelFilter::Trace, verbosity_level(200));
    }
}

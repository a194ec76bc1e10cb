//! Raycaster CLI - render a scene once, or fly through it and capture pictures.

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use raycaster::app::App;
use raycaster::config::{Command, Config};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("raycaster");

    let config = match Config::from_args(args.iter().skip(1).cloned()) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            print_usage(prog);
            return;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Try: {prog} --help");
            std::process::exit(1);
        }
    };

    let code = {
        // Guard must drop before exit so the Chrome trace gets flushed
        let _trace_guard = match init_logging(&config) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        };
        match run(&config) {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!("{e:#}");
                eprintln!("Error: {e:#}");
                if is_setup_failure(&e) {
                    eprintln!("Nothing was rendered. Check the scene, light and config files, or try: {prog} --help");
                }
                1
            }
        }
    };
    std::process::exit(code);
}

fn run(config: &Config) -> Result<()> {
    tracing::info!(
        "raycaster {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("RAYCASTER_BUILD_DATE"),
        env!("RAYCASTER_BUILD_TIME")
    );
    tracing::debug!(?config, "configuration");

    let mut app = App::from_config(config).context("scene setup failed")?;
    app.run().context("rendering failed")?;
    Ok(())
}

/// Bad input files or settings, as opposed to a failure while rendering.
fn is_setup_failure(e: &anyhow::Error) -> bool {
    e.downcast_ref::<raycaster::Error>()
        .is_some_and(raycaster::Error::is_setup_error)
}

/// Console output, plus an optional plain-text log file and an optional
/// Chrome trace (`RAYCASTER_TRACE=1`, written to `trace.json`).
fn init_logging(config: &Config) -> Result<Option<tracing_chrome::FlushGuard>> {
    let filter = if config.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    let (chrome_layer, guard) = if std::env::var("RAYCASTER_TRACE").ok().as_deref() == Some("1") {
        let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file("trace.json").build();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(chrome_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

fn print_usage(prog: &str) {
    println!("Raycaster - rasterized preview with ray-traced picture capture");
    println!();
    println!("Usage: {} [options] [scene.obj]", prog);
    println!();
    println!("Without a scene the built-in Cornell box is rendered.");
    println!();
    println!("Options:");
    println!("  -c, --config <file>       JSON config (flags override it)");
    println!("  -i, --interactive         Preview and capture on demand");
    println!("  -b, --batch               Capture one picture and exit (default)");
    println!("      --scene <file>        OBJ scene");
    println!("      --lights <file>       JSON point light list");
    println!("      --skybox <image>      Equirectangular backdrop");
    println!("      --ambient <r,g,b>     Ambient light used with point lights");
    println!("      --size <WxH>          Picture size");
    println!("      --preview-size <WxH>  Preview size");
    println!("      --scale <f>           Camera scale");
    println!("      --frame               Frame the scene bounds instead of the reference view");
    println!("  -o, --output <dir>        Picture directory");
    println!("      --format <png|hdr|exr> Picture format");
    println!("      --log-file <file>     Also log to a file");
    println!("  -v, --verbose             Debug output");
    println!("  -h, --help                Show this help");
    println!();
    println!("Interactive commands (one per line on stdin):");
    println!("  p  take picture    o  oneshot ray    q  quit");
    println!("  w/a/s/d/space/c  move    look <dx> <dy>  turn");
    println!();
    println!("Environment:");
    println!("  RUST_LOG=<filter>   Log filter");
    println!("  RAYCASTER_TRACE=1   Write a Chrome trace to trace.json");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failure_survives_context() {
        let missing = anyhow::Error::new(raycaster::Error::FileNotFound("scene.obj".into())).context("scene setup failed");
        assert!(is_setup_failure(&missing));

        let capture = anyhow::Error::new(raycaster::Error::other("capture failed")).context("rendering failed");
        assert!(!is_setup_failure(&capture));
        assert!(!is_setup_failure(&anyhow::anyhow!("plain")));
    }
}

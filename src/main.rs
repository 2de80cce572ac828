use std::path::PathBuf;

use gifgrid::RunOptions;

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(msg) => {
            eprintln!("error: {msg}");
            std::process::exit(2);
        }
    };

    if let Err(err) = gifgrid::run_with(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

/// Returns `None` when an informational flag was handled and the app should not start.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<RunOptions>, String> {
    let mut opts = RunOptions::default();
    let mut saw_flag = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("GifGrid {}", gifgrid::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "GifGrid - Browse GIPHY from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --config <path>      Read settings from <path>\n  --offline            Browse bundled sample GIFs without network access"
                );
                saw_flag = true;
            }
            "--config" => match args.next() {
                Some(path) => opts.config_file = Some(PathBuf::from(path)),
                None => return Err("--config requires a path".to_string()),
            },
            "--offline" => opts.offline = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    if saw_flag {
        Ok(None)
    } else {
        Ok(Some(opts))
    }
}

use std::error::Error;
use std::path::Path;

use primitrace::{Config, Optimizer, Step, Surface};

const USAGE: &str = "usage: primitrace <input-image> <output.png> [config.json] [history.json]\n       primitrace --example-config";

fn load_config(path: &Path) -> Result<Config, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn load_target(path: &Path, anti_alias: bool) -> Result<Surface, Box<dyn Error>> {
    profiling::scope!("load_target");
    let img = image::open(path)?.to_rgba8();
    let (w, h) = img.dimensions();
    Ok(Surface::from_rgba8(w, h, img.as_raw(), anti_alias)?)
}

fn save_surface(surface: &Surface, path: &Path) -> Result<(), Box<dyn Error>> {
    let img = image::RgbaImage::from_raw(surface.width(), surface.height(), surface.to_rgba8())
        .ok_or("output buffer does not match its dimensions")?;
    img.save(path)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // configure Rayon's global thread pool once at startup so worker threads get nice names like "rayon-0".
    let _ = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-{i}"))
        .build_global();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--example-config") {
        println!("{}", serde_json::to_string_pretty(&Config::default())?);
        return Ok(());
    }
    let (input, output) = match (args.first(), args.get(1)) {
        (Some(i), Some(o)) => (Path::new(i), Path::new(o)),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };
    let cfg = match args.get(2) {
        Some(path) => load_config(Path::new(path))?,
        None => Config::default(),
    };

    let target = load_target(input, cfg.anti_alias)?;
    let mut optimizer = Optimizer::start(target, cfg)?;
    let total = optimizer.config().total_steps;

    let mut index = 0u32;
    let mut on_step = |step: Option<&Step>| {
        index += 1;
        match step {
            Some(step) => log::info!(
                "({index} of {total}, {:.2}% similar) {:?}",
                primitrace::fitness::metrics::similarity_percent(step.distance),
                step.shape.kind()
            ),
            None => log::info!("({index} of {total}) no improvement"),
        }
    };
    let stats = optimizer.run(&mut on_step)?;

    save_surface(&optimizer.render_output()?, output)?;
    if let Some(path) = args.get(3) {
        std::fs::write(path, serde_json::to_string_pretty(optimizer.history())?)?;
    }

    let metrics = optimizer.metrics();
    println!(
        "{} shapes from {} steps: {:.2}% similar, PSNR {:.2} dB -> {}",
        stats.accepted,
        stats.steps,
        metrics.similarity,
        metrics.psnr,
        output.display()
    );
    Ok(())
}

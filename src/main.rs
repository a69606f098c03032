use anyhow::Context;
use plotkit::{
    find_plotter_port, init_logging, DeviceOptions, Drawing, Orchestrator, SerialPlotterPort,
};
use std::path::{Path, PathBuf};

/// Usage: `plotkit <drawing.json> [options.{json,toml}]`
///
/// The drawing file is a JSON `Drawing`: a list of paths, each a list of
/// `{x, y}` points in millimetres. Producing that file (SVG conversion,
/// text layout) is the business of other tools.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let mut args = std::env::args().skip(1);
    let drawing_path = args.next().map(PathBuf::from);
    let options = match args.next() {
        Some(config) => DeviceOptions::load_from_file(Path::new(&config))?,
        None => DeviceOptions::default(),
    };
    options.validate()?;

    let info = find_plotter_port()?;
    tracing::info!("using plotter on {} ({})", info.port_name, info.description);
    let port = SerialPlotterPort::open(&info.port_name)?;

    let plotter = Orchestrator::connect(Box::new(port), options).await?;

    if let Some(path) = drawing_path {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading drawing {}", path.display()))?;
        let drawing: Drawing = serde_json::from_str(&content)
            .with_context(|| format!("parsing drawing {}", path.display()))?;
        plotter.draw(drawing).await?;
        plotter.wait_until_idle().await;
    } else {
        tracing::info!("no drawing given; device configured and released");
    }

    plotter.shutdown().await?;
    Ok(())
}

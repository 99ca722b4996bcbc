//! panelkit CLI — 预设查看、页面生成与图像生成的命令行工具
//!
//! Usage:
//!   panelkit-cli presets [--category <name>]          List built-in presets
//!   panelkit-cli preset <name>                         Print a fresh page tree as JSON
//!   panelkit-cli validate <project.json>               Validate a saved project
//!   panelkit-cli providers                             List providers configured from env
//!   panelkit-cli generate <prompt> [--tier <tier>] [--image <url>] [--seed <n>]

use anyhow::{anyhow, bail, Context};
use panelkit::registry::credentials_from_env;
use panelkit::{preset, CostTier, ImageGenerationParams, Project, ProviderRegistry};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("panelkit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "presets" => cmd_presets(&args[2..]),
        "preset" => cmd_preset(&args[2..]),
        "validate" => cmd_validate(&args[2..]),
        "providers" => cmd_providers(),
        "generate" => cmd_generate(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("panelkit-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"panelkit-cli: page layout and image generation tool

USAGE:
    panelkit-cli <COMMAND> [OPTIONS]

COMMANDS:
    presets [--category <name>]     List built-in page presets
    preset <name>                   Print a freshly instantiated page tree as JSON
    validate <project.json>         Validate a saved project file
    providers                       List image providers configured from the environment
    generate <prompt> [OPTIONS]     Generate an image
        --tier <cheapest|balanced|quality>
        --image <url>               Source image (image-to-image)
        --seed <n>
        --aspect <ratio>            e.g. 3:4
    version                         Show version information
    help                            Show this help message

ENVIRONMENT:
    REPLICATE_API_KEY               Replicate API token
    REPLICATE_BASE_URL              Override the Replicate API base URL
    PANELKIT_POLL_INTERVAL_MS       Status poll interval (default 1000)
    PANELKIT_MAX_POLL_ATTEMPTS      Status poll budget (default 120)
    PANELKIT_HTTP_TIMEOUT_SECS      Per-request timeout (default 30)
    RUST_LOG                        Log filter (default panelkit=info)"#
    );
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn cmd_presets(args: &[String]) -> anyhow::Result<()> {
    let presets: Vec<&preset::Preset> = match flag_value(args, "--category") {
        Some(category) => preset::presets_in_category(category),
        None => preset::builtin_presets().iter().collect(),
    };
    for p in presets {
        println!(
            "{:<18} {:<8} {} panels",
            p.name,
            p.category,
            p.instantiate().leaf_count()
        );
    }
    Ok(())
}

fn cmd_preset(args: &[String]) -> anyhow::Result<()> {
    let name = args
        .first()
        .ok_or_else(|| anyhow!("usage: panelkit-cli preset <name>"))?;
    let preset = preset::find_preset(name).ok_or_else(|| anyhow!("unknown preset '{name}'"))?;
    println!("{}", serde_json::to_string_pretty(&preset.instantiate())?);
    Ok(())
}

fn cmd_validate(args: &[String]) -> anyhow::Result<()> {
    let path = args
        .first()
        .ok_or_else(|| anyhow!("usage: panelkit-cli validate <project.json>"))?;
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let project = Project::from_json(&content)?;
    println!(
        "✓ {} ({} pages, {} panels)",
        project.name,
        project.pages.len(),
        project.pages.iter().map(|p| p.root.leaf_count()).sum::<usize>()
    );
    Ok(())
}

fn cmd_providers() -> anyhow::Result<()> {
    let registry = ProviderRegistry::from_credentials(&credentials_from_env())?;
    if registry.is_empty() {
        println!("No providers configured. Set REPLICATE_API_KEY.");
        return Ok(());
    }
    for info in registry.list_providers() {
        let caps: Vec<String> = info.capabilities.iter().map(|c| c.to_string()).collect();
        println!("{:<12} {:<12} {}", info.id, info.name, caps.join(", "));
    }
    Ok(())
}

fn cmd_generate(args: &[String]) -> anyhow::Result<()> {
    let Some(prompt) = args.first().filter(|a| !a.starts_with("--")) else {
        bail!("usage: panelkit-cli generate <prompt> [--tier <tier>] [--image <url>]");
    };

    let tier = match flag_value(args, "--tier") {
        Some(t) => t.parse::<CostTier>()?,
        None => CostTier::default(),
    };
    let mut params = ImageGenerationParams::new(prompt.as_str());
    if let Some(image) = flag_value(args, "--image") {
        params = params.input_image(image);
    }
    if let Some(seed) = flag_value(args, "--seed") {
        params = params.seed(seed.parse().context("--seed must be an integer")?);
    }
    if let Some(aspect) = flag_value(args, "--aspect") {
        params = params.aspect_ratio(aspect);
    }

    let registry = ProviderRegistry::from_credentials(&credentials_from_env())?;
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(registry.generate_image(&params, tier))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

//! Serve command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::ServeArgs;
use crate::inference::{ModelVariant, VariantPaths};
use crate::server::{serve, ServerConfig};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Collect the variants whose generator and discriminator are both given
fn variant_paths(args: &ServeArgs) -> Result<BTreeMap<ModelVariant, VariantPaths>, String> {
    let pairs = [
        (ModelVariant::Object, &args.object_gen, &args.object_disc),
        (ModelVariant::Scene, &args.scene_gen, &args.scene_disc),
    ];

    let mut paths = BTreeMap::new();
    for (variant, generator, discriminator) in pairs {
        match (generator, discriminator) {
            (Some(generator), Some(discriminator)) => {
                let variant_paths = VariantPaths::from_checkpoints(generator, discriminator)
                    .map_err(|e| format!("Checkpoint error ({variant}): {e}"))?;
                paths.insert(variant, variant_paths);
            }
            (None, None) => {}
            _ => {
                return Err(format!(
                    "{variant} model needs both --{variant}-gen and --{variant}-disc"
                ))
            }
        }
    }

    if paths.is_empty() {
        return Err("No models given; pass --object-gen/--object-disc or --scene-gen/--scene-disc".into());
    }
    Ok(paths)
}

fn describe(paths: &BTreeMap<ModelVariant, VariantPaths>) -> Vec<String> {
    paths
        .iter()
        .map(|(variant, p)| {
            format!("  {variant}: {} + {}", p.generator.display(), p.discriminator.display())
        })
        .collect()
}

pub fn run_serve(args: ServeArgs, level: LogLevel) -> Result<(), String> {
    let address: SocketAddr =
        args.addr.parse().map_err(|e| format!("Invalid address '{}': {e}", args.addr))?;
    let paths = variant_paths(&args)?;

    log(level, LogLevel::Normal, &format!("Boceto: serving on http://{address}"));
    for line in describe(&paths) {
        log(level, LogLevel::Verbose, &line);
    }

    let config = ServerConfig::default().with_address(address).with_samples(args.samples);
    serve(paths, config).map_err(|e| format!("Server error: {e}"))
}

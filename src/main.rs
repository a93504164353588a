use clap::Parser;
use wsdl_resolver::utils::{logger, validation::Validate};
use wsdl_resolver::{BindingFilter, CliConfig, DocumentSet, Resolution, WsdlResolver};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let file_config = match cli.file_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if cli.json_logs || file_config.json_logs() {
        logger::init_json_logger(file_config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting wsdl-resolve");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let resolver = WsdlResolver::new(cli.fetch_config(file_config.fetch.clone()));

    let resolution = match resolve(&resolver, &cli).await {
        Ok(resolution) => resolution,
        Err(e) => {
            tracing::error!("Resolution failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(if e.is_size_limit() { 3 } else { 2 });
        }
    };

    if let Err(e) = report(&resolution) {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(2);
    }

    if let Some(path) = &cli.snapshot_out {
        if let Err(e) = write_snapshot(path, &resolution.snapshot()) {
            tracing::error!("Unable to write snapshot: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
        println!("📁 Snapshot saved to: {}", path);
    }
}

async fn resolve(resolver: &WsdlResolver, cli: &CliConfig) -> wsdl_resolver::Result<Resolution> {
    match (&cli.uri, &cli.replay) {
        (Some(uri), _) => resolver.resolve(uri).await,
        (None, Some(path)) => {
            let content = std::fs::read_to_string(path)?;
            let documents: DocumentSet = serde_json::from_str(&content)?;
            resolver.replay(&documents).await
        }
        (None, None) => Err(wsdl_resolver::WsdlError::ConfigError {
            message: "either a URI or --replay is required".to_string(),
        }),
    }
}

fn report(resolution: &Resolution) -> wsdl_resolver::Result<()> {
    let wsdl = &resolution.wsdl;

    println!("✅ Resolved {}", wsdl.document_uri());
    println!(
        "   {} documents, {} fetches ({} failed)",
        wsdl.graph().len(),
        resolution.resources.len(),
        resolution.failed_fetches().count()
    );

    if let Some(name) = wsdl.service_name() {
        println!("   service: {}", name);
    }
    if let Some(uri) = wsdl.service_uri() {
        println!("   SOAP address: {}", uri);
    }
    for (prefix, uri) in wsdl.namespaces() {
        println!("   xmlns:{}=\"{}\"", prefix, uri);
    }

    for binding in wsdl.bindings(BindingFilter::All) {
        println!("   binding {} ({})", binding.name, wsdl.binding_style_of(binding));
        for operation in &binding.operations {
            let soap_use = match wsdl.soap_use(operation) {
                Ok(u) => u.to_string(),
                Err(e) => format!("invalid: {}", e),
            };
            let policy = wsdl
                .effective_input_policy(binding, operation)?
                .map(|p| format!(", {} policy alternatives", p.alternatives.len()))
                .unwrap_or_default();
            println!(
                "     - {} [{} / {}{}{}]",
                operation.name,
                wsdl.binding_style(operation),
                soap_use,
                if wsdl.is_multipart(operation) { ", multipart" } else { "" },
                policy
            );
        }
    }

    let analysis = resolution.schema_analysis();
    println!(
        "   schema elements: {} request-only, {} response-only, {} shared",
        analysis.input_only().len(),
        analysis.output_only().len(),
        analysis.shared().len()
    );

    Ok(())
}

fn write_snapshot(path: &str, documents: &DocumentSet) -> wsdl_resolver::Result<()> {
    let json = serde_json::to_string_pretty(documents)?;
    std::fs::write(path, json)?;
    Ok(())
}

use anyhow::{Context, Result};
use bat::PrettyPrinter;
use clap::Parser;
use cliclack::{input, spinner};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use llm_relay::providers::configs::base::ProviderConfig;
use llm_relay::{Agent, ClientConfig, Completion};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (can also be set via OLLAMA_HOST environment variable)
    #[arg(long)]
    host: Option<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Backend family: ollama, lmstudio or openai
    #[arg(short, long)]
    provider: Option<String>,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Image to send along with the prompt
    #[arg(long)]
    image: Option<PathBuf>,

    /// Read the prompt from a text file (appended after any message words)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the answer to a file instead of rendering it
    #[arg(long)]
    output: Option<PathBuf>,

    /// Context window size
    #[arg(long)]
    num_ctx: Option<u32>,

    #[arg(long)]
    temperature: Option<f64>,

    /// Request streaming responses from ollama
    #[arg(long)]
    stream: bool,

    /// Log every message exchanged with the backend
    #[arg(long)]
    debug: bool,

    /// Prompt text; starts an interactive session when empty
    message: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = build_config(&cli)?;
    let agent = Agent::new(config)?;

    let image = match &cli.image {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("Failed to read image file {}", path.display()))?,
        ),
        None => None,
    };

    let mut prompt = cli.message.join(" ");
    if let Some(path) = &cli.input {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        if !prompt.is_empty() {
            prompt.push(' ');
        }
        prompt.push_str(&text);
    }

    if prompt.is_empty() {
        return interactive(&agent, cli.system.as_deref());
    }

    let completion = ask(&agent, &prompt, cli.system.as_deref(), image.as_deref());
    if !completion.is_success() {
        anyhow::bail!("Generation failed with status {}", completion.status);
    }

    match &cli.output {
        Some(path) => std::fs::write(path, &completion.text)
            .with_context(|| format!("Failed to write output file {}", path.display()))?,
        None => render(&completion.text)?,
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?,
    };

    if let Some(host) = &cli.host {
        config.base_url = host.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(provider) = &cli.provider {
        config.provider = provider.clone();
        if cli.config.is_none() {
            config.api_key = ClientConfig::api_key_from_env(provider)?;
        }
    }
    if let Some(num_ctx) = cli.num_ctx {
        config.num_ctx = num_ctx;
    }
    if let Some(temperature) = cli.temperature {
        config.sampling.temperature = temperature;
    }
    config.stream |= cli.stream;
    config.debug_echo |= cli.debug;

    config.validate()?;
    Ok(config)
}

fn init_logging(debug: bool) {
    let default = if debug { "llm_relay=debug" } else { "llm_relay=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn ask(agent: &Agent, prompt: &str, system: Option<&str>, image: Option<&[u8]>) -> Completion {
    let spin = spinner();
    spin.start("awaiting reply");
    let completion = agent.generate(prompt, system, image);
    spin.stop("");
    completion
}

fn interactive(agent: &Agent, system: Option<&str>) -> Result<()> {
    println!(
        "{} {} {}",
        agent.config().provider,
        agent.config().model,
        style("- type \"exit\" to end the session").dim()
    );
    println!("\n");

    loop {
        let message_text: String = input("Message:").placeholder("").multiline().interact()?;

        if message_text.trim().eq_ignore_ascii_case("exit") {
            break;
        }

        let completion = ask(agent, &message_text, system, None);
        if completion.is_success() {
            render(&completion.text)?;
        } else {
            println!("{}", style(format!("Error: {}", completion.status)).red());
        }
        println!("\n");
    }
    Ok(())
}

fn render(content: &str) -> Result<()> {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .map_err(|e| anyhow::anyhow!("Failed to render output: {}", e))?;
    Ok(())
}

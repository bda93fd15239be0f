use std::path::PathBuf;

use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use imagegen_engine::model::{
    Content, Gemini, GenerativeModel, Modality, Request, safety::default_safety_settings,
};

/// Sends a single prompt straight to a model, no templates, no routing.
#[derive(clap::Parser)]
struct Arg {
    model: String,
    key: String,
    prompt: String,

    /// system instruction sent along with the prompt
    #[arg(short, long)]
    system: Option<String>,

    /// ask for an image and write it here
    #[arg(short, long)]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Arg {
        model,
        key,
        prompt,
        system,
        image,
    } = Arg::parse();

    let client = Gemini::new(key);
    let req = Request {
        model,
        system,
        contents: vec![Content::user_text(prompt)],
        safety_settings: default_safety_settings(),
        modalities: if image.is_some() {
            vec![Modality::Text, Modality::Image]
        } else {
            Vec::new()
        },
        ..Default::default()
    };
    let resp = client.generate(req).await?;

    if let Some(text) = resp.text() {
        println!("{text}");
    }
    if let Some(path) = image {
        let img = resp.image().ok_or(eyre!("the model answered without an image"))?;
        std::fs::write(&path, &img.data)?;
        println!("Saved image, {} bytes", img.data.len());
    }
    println!("finish reason: {:?}", resp.finish_reason);

    Ok(())
}

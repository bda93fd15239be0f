use std::path::PathBuf;

use clap::Parser;
use color_eyre::{
    Report, Result,
    eyre::{WrapErr as _, bail, eyre},
};
use imagegen::{
    API_KEY_VARS, Config, build_session,
    cli::{Adjust, Cli, Command, ConfigCommand, Feedback, Generate},
    config_path, image_path, load_config, resolve_api_key, resolve_role, save_config,
};
use imagegen_engine::{
    FlowError, Session,
    flows::{FeedbackAnalysis, RefinePromptInput},
    params::ParameterSet,
    session::Generation,
};
use indoc::formatdoc;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    pretty_env_logger::init();
    let cli = Cli::parse();
    let identity = cli.identity();

    let command = match cli.command {
        Command::Config(cmd) => return config_command(&cmd),
        command => command,
    };

    let cfg = load_config()?.unwrap_or_default();
    let api_key = resolve_api_key(cli.api_key.as_deref(), |var| std::env::var(var).ok(), &cfg)
        .ok_or_else(|| {
            eyre!(
                "No API key. Pass --api-key, set {} or add it to {}",
                API_KEY_VARS.join(" / "),
                config_path().map(|p| p.display().to_string()).unwrap_or_default()
            )
        })?;

    let role = resolve_role(&identity, cli.role, &cfg);
    info!("running as {role}");

    let mut session = build_session(&cfg, api_key, role)?;
    run(&mut session, command).await
}

/// Flow errors are shown the way the user should see them.
fn report(e: FlowError) -> Report {
    eyre!(e.user_message())
}

async fn run(session: &mut Session, command: Command) -> Result<()> {
    match command {
        Command::Refine { prompt } => {
            let refined = session
                .flows()
                .refine_prompt(RefinePromptInput {
                    user_prompt: prompt,
                    tier: session.role().tier(),
                })
                .await
                .map_err(report)?;
            println!("{}\n\n({})", refined.refined_prompt, refined.model_label());
        }
        Command::Generate(Generate {
            prompt,
            raw,
            output,
            params,
        }) => {
            session
                .set_parameters(params.apply(session.params()))
                .map_err(report)?;
            let generation = session.create_image(&prompt, !raw).await.map_err(report)?;
            save_generation(generation, output)?;
        }
        Command::Adjust(Adjust {
            prompt,
            feedback,
            params,
        }) => {
            session
                .set_parameters(params.apply(session.params()))
                .map_err(report)?;
            let before = session.params();
            let after = session
                .adjust_parameters(&prompt, &feedback)
                .await
                .map_err(report)?;
            print_parameters(&before, &after);
        }
        Command::Feedback(Feedback {
            rating,
            comments,
            prompt,
            output,
            params,
        }) => {
            session
                .set_parameters(params.apply(session.params()))
                .map_err(report)?;
            if let Some(prompt) = prompt {
                let generation = session.create_image(&prompt, true).await.map_err(report)?;
                save_generation(generation, output)?;
            }
            let analysis = session
                .submit_feedback(rating, &comments)
                .await
                .map_err(report)?;
            print_analysis(&analysis);
            if !analysis.success {
                bail!("feedback analysis failed");
            }
        }
        Command::Config(_) => unreachable!("config commands run without a session"),
    }
    Ok(())
}

fn save_generation(generation: &Generation, output: Option<PathBuf>) -> Result<()> {
    let image = &generation.image;
    let path = image_path(output, &image.image);
    std::fs::write(&path, &image.image.data)
        .wrap_err_with(|| format!("Couldn't write {}", path.display()))?;

    if let Some(refined) = &generation.refined {
        println!("Refined prompt ({}):\n{}\n", refined.model_label(), refined.refined_prompt);
    }
    if let Some(text) = &image.model_text {
        println!("Model says: {text}\n");
    }
    println!(
        "Saved {} ({} bytes, {})",
        path.display(),
        image.image.data.len(),
        image.model_used
    );
    Ok(())
}

fn config_command(cmd: &ConfigCommand) -> Result<()> {
    let path = config_path()?;
    match cmd {
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists, use --force to overwrite it", path.display());
            }
            save_config(&Config::default())?;
            println!("Wrote {}", path.display());
        }
        ConfigCommand::Show => match load_config()? {
            Some(mut cfg) => {
                cfg.api_key = cfg.api_key.map(|_| "<hidden>".to_string());
                println!(
                    "{}",
                    ron::ser::to_string_pretty(&cfg, ron::ser::PrettyConfig::default())?
                );
            }
            None => println!("No config at {}, defaults are used", path.display()),
        },
    }
    Ok(())
}

fn print_parameters(before: &ParameterSet, after: &ParameterSet) {
    println!(
        "{}",
        formatdoc! {"
            CFG scale:           {:>6.2} -> {:>6.2}
            Steps:               {:>6} -> {:>6}
            Realism enhancement: {:>6.2} -> {:>6.2}",
            before.cfg_scale, after.cfg_scale,
            before.steps, after.steps,
            before.realism_enhancement, after.realism_enhancement,
        }
    );
}

fn print_analysis(analysis: &FeedbackAnalysis) {
    println!("{}", analysis.message);
    if let Some(overall) = &analysis.overall_assessment {
        println!("\n{overall}");
    }
    for (i, s) in analysis.improvement_suggestions.iter().enumerate() {
        println!(
            "\n{}",
            formatdoc! {"
                {n}. {area}
                   Problem:  {problem}
                   Change:   {change}
                   Why:      {reasoning}
                   Impact:   {impact}",
                n = i + 1,
                area = s.area_to_improve,
                problem = s.current_problem,
                change = s.suggested_change,
                reasoning = s.reasoning,
                impact = s.potential_impact,
            }
        );
    }
}

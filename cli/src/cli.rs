use std::path::PathBuf;

use imagegen_engine::{
    params::ParameterSet,
    role::{Identity, UserRole},
};

#[derive(Debug, clap::Parser)]
#[command(version, about = "Prompt refinement and image generation on top of Gemini")]
pub struct Cli {
    /// Overrides GEMINI_API_KEY / GOOGLE_API_KEY and the config file
    #[arg(short = 'k', long, global = true)]
    pub api_key: Option<String>,

    /// Act as this signed-in user
    #[arg(short, long, global = true, conflicts_with = "guest")]
    pub email: Option<String>,

    /// Act as a guest that is not signed in (the default)
    #[arg(long, global = true)]
    pub guest: bool,

    /// Skip the identity check and use this role
    #[arg(long, global = true, value_enum)]
    pub role: Option<UserRole>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// `--guest` or no `--email` means nobody is signed in.
    pub fn identity(&self) -> Identity {
        match &self.email {
            Some(email) if !self.guest => Identity::signed_in(email.as_str()),
            _ => Identity::guest(),
        }
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Rewrite a prompt into a detailed, photorealistic one
    Refine { prompt: String },

    /// Generate an image, by default from the refined prompt
    Generate(Generate),

    /// Let a model tune the generation parameters based on feedback
    Adjust(Adjust),

    /// Turn feedback into improvement suggestions
    Feedback(Feedback),

    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, clap::Args)]
pub struct Generate {
    pub prompt: String,

    /// Send the prompt as is
    #[arg(long)]
    pub raw: bool,

    /// Defaults to image.<ext> in the working directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub params: ParamArgs,
}

#[derive(Debug, clap::Args)]
pub struct Adjust {
    pub prompt: String,

    #[arg(short, long)]
    pub feedback: String,

    #[command(flatten)]
    pub params: ParamArgs,
}

#[derive(Debug, clap::Args)]
pub struct Feedback {
    /// 1 to 5 stars
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub rating: Option<u8>,

    #[arg(short, long, default_value = "")]
    pub comments: String,

    /// Generate from this prompt first, so the feedback comes with an example
    #[arg(long)]
    pub prompt: Option<String>,

    /// Where the image generated for `--prompt` goes, defaults to image.<ext>
    #[arg(short, long, requires = "prompt")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub params: ParamArgs,
}

/// Slider values. Anything left out keeps its default.
#[derive(Debug, Default, clap::Args)]
pub struct ParamArgs {
    #[arg(long)]
    pub cfg_scale: Option<f64>,

    #[arg(long)]
    pub steps: Option<u32>,

    #[arg(long)]
    pub realism: Option<f64>,
}

impl ParamArgs {
    pub fn apply(&self, mut params: ParameterSet) -> ParameterSet {
        if let Some(v) = self.cfg_scale {
            params.cfg_scale = v;
        }
        if let Some(v) = self.steps {
            params.steps = v;
        }
        if let Some(v) = self.realism {
            params.realism_enhancement = v;
        }
        params
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum ConfigCommand {
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    Show,
    Path,
}

#[cfg(test)]
mod test {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_args() {
        let cli = Cli::try_parse_from([
            "imagegen", "generate", "a cat", "--raw", "-o", "cat.png", "--steps", "80", "--email",
            "me@example.com",
        ])
        .unwrap();
        assert_eq!(cli.email.as_deref(), Some("me@example.com"));
        let Command::Generate(generate) = cli.command else {
            panic!("expected generate");
        };
        assert!(generate.raw);
        assert_eq!(generate.output, Some(PathBuf::from("cat.png")));
        let params = generate.params.apply(ParameterSet::default());
        assert_eq!(params.steps, 80);
        assert_eq!(params.cfg_scale, 7.5);
    }

    #[test]
    fn rating_is_bounded() {
        assert!(Cli::try_parse_from(["imagegen", "feedback", "-r", "6"]).is_err());
        assert!(Cli::try_parse_from(["imagegen", "feedback", "-r", "5"]).is_ok());
    }

    #[test]
    fn guest_and_email_conflict() {
        assert!(
            Cli::try_parse_from(["imagegen", "--guest", "--email", "a@b.c", "refine", "x"]).is_err()
        );
    }

    #[test]
    fn identity_from_flags() {
        let cli = Cli::try_parse_from(["imagegen", "--email", "me@example.com", "refine", "x"]).unwrap();
        assert_eq!(cli.identity(), Identity::signed_in("me@example.com"));

        let cli = Cli::try_parse_from(["imagegen", "--guest", "refine", "x"]).unwrap();
        assert!(cli.guest);
        assert_eq!(cli.identity(), Identity::guest());

        let cli = Cli::try_parse_from(["imagegen", "refine", "x"]).unwrap();
        assert_eq!(cli.identity(), Identity::guest());
    }

    #[test]
    fn feedback_output_needs_a_prompt() {
        assert!(Cli::try_parse_from(["imagegen", "feedback", "-r", "3", "-o", "x.png"]).is_err());
        let cli = Cli::try_parse_from([
            "imagegen", "feedback", "-r", "3", "--prompt", "a cat", "-o", "x.png",
        ])
        .unwrap();
        let Command::Feedback(feedback) = cli.command else {
            panic!("expected feedback");
        };
        assert_eq!(feedback.output, Some(PathBuf::from("x.png")));
    }

    #[test]
    fn role_override() {
        let cli = Cli::try_parse_from(["imagegen", "refine", "x", "--role", "pro"]).unwrap();
        assert_eq!(cli.role, Some(UserRole::Pro));
    }
}

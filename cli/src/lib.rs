use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{Result, eyre::eyre};
use imagegen_engine::{
    Flows, Session,
    model::{Gemini, Image, SafetySetting, safety::default_safety_settings},
    role::{AdminAllowList, Identity, UserRole},
    router::ModelCatalog,
};
use log::debug;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub mod cli;

pub const APP_NAME: &str = "imagegen";

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    /// Overrides the public endpoint, mostly for proxies.
    pub api_base: Option<String>,
    pub models: ModelCatalog,
    pub admin_emails: Vec<String>,
    pub safety_settings: Vec<SafetySetting>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            models: ModelCatalog::default(),
            admin_emails: Vec::new(),
            safety_settings: default_safety_settings(),
        }
    }
}

impl Config {
    pub fn admin_allow_list(&self) -> AdminAllowList {
        AdminAllowList::new(&self.admin_emails)
    }
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    Ok(ron::from_str(&src)?)
}

pub fn save_ron_file<T: Serialize>(path: &Path, x: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let src = ron::ser::to_string_pretty(x, ron::ser::PrettyConfig::default())?;
    Ok(fs::write(path, src)?)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join(format!("{APP_NAME}.ron")))
}

pub fn load_config() -> Result<Option<Config>> {
    let path = config_path()?;
    if !path.exists() {
        Ok(None)
    } else {
        load_ron_file(&path).map(Some)
    }
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let path = config_path()?;
    save_ron_file(&path, cfg)?;
    Ok(())
}

/// Command line first, then the environment, then the config file.
pub fn resolve_api_key(
    flag: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    cfg: &Config,
) -> Option<String> {
    let non_empty = |s: String| {
        let s = s.trim().to_string();
        (!s.is_empty()).then_some(s)
    };

    flag.map(str::to_string)
        .and_then(non_empty)
        .or_else(|| API_KEY_VARS.iter().find_map(|var| env(var).and_then(non_empty)))
        .or_else(|| cfg.api_key.clone().and_then(non_empty))
}

/// `forced` wins, then the identity is checked against the admin list.
pub fn resolve_role(identity: &Identity, forced: Option<UserRole>, cfg: &Config) -> UserRole {
    let role = forced.unwrap_or_else(|| cfg.admin_allow_list().resolve(identity));
    debug!("resolved {identity:?} to {role}");
    role
}

/// `output`, or `image.<ext>` in the working directory.
pub fn image_path(output: Option<PathBuf>, image: &Image) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(format!("image.{}", image.extension())))
}

pub fn build_session(cfg: &Config, api_key: String, role: UserRole) -> Result<Session> {
    let client = match &cfg.api_base {
        Some(base) => Gemini::with_base_url(api_key, base.as_str()),
        None => Gemini::new(api_key),
    };
    let flows = Flows::new(Box::new(client), cfg.models.clone())?
        .with_safety_settings(cfg.safety_settings.clone());
    Ok(Session::new(flows, role))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("imagegen.ron");
        let cfg = Config {
            api_key: Some("secret".into()),
            admin_emails: vec!["boss@example.com".into()],
            ..Default::default()
        };
        save_ron_file(&path, &cfg).unwrap();
        let loaded: Config = load_ron_file(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.ron");
        fs::write(&path, r#"(api_key: Some("k"), models: (standard_text: "a", premium_text: "b", image: "c"))"#)
            .unwrap();
        let cfg: Config = load_ron_file(&path).unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.models.image, "c");
        assert_eq!(cfg.safety_settings, default_safety_settings());
    }

    #[test]
    fn api_key_precedence() {
        let cfg = Config {
            api_key: Some("from-config".into()),
            ..Default::default()
        };
        let env = |var: &str| (var == "GOOGLE_API_KEY").then(|| "from-env".to_string());
        let no_env = |_: &str| -> Option<String> { None };

        assert_eq!(
            resolve_api_key(Some("from-flag"), env, &cfg).as_deref(),
            Some("from-flag")
        );
        assert_eq!(resolve_api_key(None, env, &cfg).as_deref(), Some("from-env"));
        assert_eq!(resolve_api_key(Some("  "), no_env, &cfg).as_deref(), Some("from-config"));
        assert_eq!(resolve_api_key(None, no_env, &Config::default()), None);
    }

    #[test]
    fn image_path_defaults_to_the_mime_type() {
        let jpeg = Image {
            mime_type: "image/jpeg".into(),
            data: vec![],
        };
        assert_eq!(image_path(None, &jpeg), PathBuf::from("image.jpeg"));
        assert_eq!(
            image_path(Some("out/cat.jpg".into()), &jpeg),
            PathBuf::from("out/cat.jpg")
        );
    }

    #[test]
    fn roles() {
        let cfg = Config {
            admin_emails: vec![" Boss@Example.com ".into()],
            ..Default::default()
        };
        let boss = Identity::signed_in("boss@example.com");
        assert_eq!(resolve_role(&boss, None, &cfg), UserRole::Admin);
        assert_eq!(
            resolve_role(&Identity::signed_in("someone@example.com"), None, &cfg),
            UserRole::Pro
        );
        assert_eq!(resolve_role(&Identity::guest(), None, &cfg), UserRole::Guest);
        assert_eq!(resolve_role(&boss, Some(UserRole::Free), &cfg), UserRole::Free);
    }
}

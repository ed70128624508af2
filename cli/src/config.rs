use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use potluck_core::MealRepository;
use potluck_core::session::Session;
use potluck_core::store::StoreKind;

pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub csv_path: PathBuf,
    pub store: StoreKind,
    pub user: Option<String>,
}

impl Config {
    /// Resolve paths and settings. `store` from the command line wins over
    /// `POTLUCK_STORE`.
    pub fn load(store: Option<StoreKind>) -> Result<Self> {
        let data_dir = match std::env::var_os("POTLUCK_DATA_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "potluck")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        let store = match store {
            Some(kind) => kind,
            None => match std::env::var("POTLUCK_STORE") {
                Ok(value) if !value.trim().is_empty() => value
                    .parse()
                    .context("Invalid POTLUCK_STORE value")?,
                _ => StoreKind::Sqlite,
            },
        };
        let user = std::env::var("POTLUCK_USER").ok();
        Self::from_parts(data_dir, store, user)
    }

    fn from_parts(data_dir: PathBuf, store: StoreKind, user: Option<String>) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("potluck.db"),
            csv_path: data_dir.join("meals.csv"),
            data_dir,
            store,
            user: user.filter(|u| !u.trim().is_empty()),
        })
    }

    /// The file backing the selected store.
    pub fn store_path(&self) -> &Path {
        match self.store {
            StoreKind::Sqlite => &self.db_path,
            StoreKind::Csv => &self.csv_path,
        }
    }

    pub fn open_repository(&self) -> Result<MealRepository> {
        let repo = MealRepository::open(self.store, self.store_path()).with_context(|| {
            format!(
                "Failed to open {} store at {}",
                self.store,
                self.store_path().display()
            )
        })?;
        Ok(repo.with_image_root(&self.data_dir))
    }

    pub fn session(&self) -> Session {
        match &self.user {
            Some(user) => Session::signed_in(user),
            None => Session::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_inside_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("potluck");
        let config = Config::from_parts(data_dir.clone(), StoreKind::Csv, None).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(config.store_path(), data_dir.join("meals.csv"));
        assert_eq!(config.db_path, data_dir.join("potluck.db"));
    }

    #[test]
    fn test_session_from_user() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_parts(
            dir.path().to_path_buf(),
            StoreKind::Sqlite,
            Some("alice".into()),
        )
        .unwrap();
        assert_eq!(config.session().user_id(), Some("alice"));

        let config =
            Config::from_parts(dir.path().to_path_buf(), StoreKind::Sqlite, Some("  ".into()))
                .unwrap();
        assert!(!config.session().is_authenticated());
    }

    #[test]
    fn test_open_repository_for_each_store() {
        let dir = tempfile::tempdir().unwrap();
        for store in [StoreKind::Sqlite, StoreKind::Csv] {
            let config = Config::from_parts(dir.path().to_path_buf(), store, None).unwrap();
            let repo = config.open_repository().unwrap();
            assert!(repo.get_all().unwrap().is_empty());
            assert_eq!(repo.image_root(), Some(dir.path()));
        }
    }
}

//! A filesystem `ArticleSource`: one JSON file per statute, named
//! `<law_id>.json`, deserializing directly to `StatuteRecord`. This is the
//! CLI's offline stand-in for whatever markup-extraction pipeline a
//! production deployment would wire in behind the same trait.

use std::fs;
use std::path::PathBuf;

use citelaw_core::ports::ArticleSource;
use citelaw_core::{CiteError, LawId, StatuteRecord};

pub struct FileArticleSource {
    dir: PathBuf,
}

impl FileArticleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &LawId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }
}

impl ArticleSource for FileArticleSource {
    fn list_current_statutes(&self) -> Result<Vec<LawId>, CiteError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            CiteError::Fatal(format!(
                "cannot read statute directory {}: {e}",
                self.dir.display()
            ))
        })?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| CiteError::Fatal(format!("cannot read directory entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            ids.push(LawId::new(stem));
        }
        ids.sort();
        Ok(ids)
    }

    fn get_statute(&self, id: &LawId) -> Result<StatuteRecord, CiteError> {
        let path = self.path_for(id);
        let content = fs::read_to_string(&path)
            .map_err(|_| CiteError::NotFound(format!("no statute file for {id}")))?;
        serde_json::from_str(&content)
            .map_err(|e| CiteError::DataDefect(format!("malformed statute file {}: {e}", path.display())))
    }
}

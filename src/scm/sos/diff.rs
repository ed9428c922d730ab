//! DiffX generation for SOS workareas

use std::fs;
use std::io;

use serde_json::{Map, Value, json};

use crate::config::DiffOptions;
use crate::diff::{DEV_NULL, DiffEngine, DiffType, DiffX, DiffXFile, render_file_diff};
use crate::fetch::{self, Scratch};
use crate::filter::{PathFilter, normalize_path};
use crate::model::{ChangeOp, ChangeRecord, ChangeStatus, DiffResult, ObjectKind};
use crate::scm::changeset;
use crate::scm::{Backend, DiffOutput, RevisionSpec, ScmError, ScmKind};

use super::constants::{queries, selections};
use super::parser::Parser;
use super::{SosClient, SosRevision};

/// Repository identity for the review request record
struct SosIdentity {
    project: String,
    server: String,
}

impl Backend for SosClient {
    fn kind(&self) -> ScmKind {
        ScmKind::Sos
    }

    fn parse_revision_spec(&mut self, revisions: &[String]) -> Result<RevisionSpec, ScmError> {
        SosRevision::parse(revisions, || self.supports_changelists()).map(RevisionSpec::Sos)
    }

    /// Diff the selection or changelist against the checked-in revisions
    ///
    /// The user's SOS selection is saved first and restored afterward,
    /// even when diff generation fails.
    fn diff(
        &mut self,
        revisions: &RevisionSpec,
        options: &DiffOptions,
    ) -> Result<DiffOutput, ScmError> {
        let RevisionSpec::Sos(revision) = revisions else {
            return Err(ScmError::InvalidRevisionSpec(
                "Expected an SOS selection or changelist".to_string(),
            ));
        };

        let filter = PathFilter::new(&options.include_files, &options.exclude_patterns)?;
        let engine = DiffEngine::new(options.context_lines);
        let scratch = Scratch::new()?;

        let stash = scratch.make_tempfile(None)?;
        self.stash_selection(&stash)?;

        let built = fetch::scoped(
            self,
            |client| client.restore_selection(&stash),
            |client| client.build_diffx(revision, options, &filter, &scratch, &engine),
        )?;

        let Some((diffx, identity)) = built else {
            return Ok(DiffOutput::empty());
        };

        let mut extra_data = Map::new();
        extra_data.insert("sos_project".to_string(), identity.project.into());
        extra_data.insert("sos_server".to_string(), identity.server.into());
        extra_data.insert("sos_workarea".to_string(), self.workarea_id()?.into());
        if let Some(changelist) = revision.changelist() {
            extra_data.insert("sos_changelist".to_string(), changelist.into());
        }

        Ok(DiffOutput {
            diff: diffx.to_bytes()?,
            extra_data: Some(extra_data),
        })
    }

    fn tree_matches_review_request(
        &mut self,
        extra_data: &Map<String, Value>,
        revisions: &RevisionSpec,
    ) -> Result<bool, ScmError> {
        let RevisionSpec::Sos(SosRevision::Changelist(local_changelist)) = revisions else {
            return Ok(false);
        };

        let field = |key: &str| extra_data.get(key).and_then(Value::as_str);
        let (Some(project), Some(server), Some(workarea), Some(changelist)) = (
            field("sos_project"),
            field("sos_server"),
            field("sos_workarea"),
            field("sos_changelist"),
        ) else {
            return Ok(false);
        };

        Ok(changelist == local_changelist
            && workarea == self.workarea_id()?
            && self.query(queries::PROJECT)?.as_deref() == Some(project)
            && self.query(queries::SERVER)?.as_deref() == Some(server))
    }
}

impl SosClient {
    /// Build the document, or `None` when nothing is left to post
    fn build_diffx(
        &mut self,
        revision: &SosRevision,
        options: &DiffOptions,
        filter: &PathFilter,
        scratch: &Scratch,
        engine: &DiffEngine,
    ) -> Result<Option<(DiffX, SosIdentity)>, ScmError> {
        let to_strings = |flags: &[&str]| flags.iter().map(|f| f.to_string()).collect::<Vec<_>>();

        let (selection, changelist) = match revision {
            SosRevision::Changelist(id) => {
                (to_strings(selections::CHANGELIST), Some(self.changelist_paths(id)?))
            }
            SosRevision::Selection { flags, explicit } => {
                if !options.include_files.is_empty() && !explicit {
                    let mut selection = to_strings(selections::INCLUDE_FILES);
                    selection.extend(options.include_files.iter().cloned());
                    (selection, None)
                } else {
                    (flags.clone(), None)
                }
            }
        };

        let records: Vec<ChangeRecord> = changeset::assemble(self, &selection, changelist.as_ref())?
            .into_iter()
            .filter(|record| record.kind != ObjectKind::Directory)
            .filter(|record| filter.matches(record.path()))
            .collect();

        if records.is_empty() {
            log::debug!("No files matched the SOS selection");
            return Ok(None);
        }

        let identity = SosIdentity {
            project: self.require(queries::PROJECT)?,
            server: self.require(queries::SERVER)?,
        };
        let rso = self.require(queries::RSO)?;

        let mut sos_meta = Map::new();
        sos_meta.insert("project".to_string(), identity.project.clone().into());
        sos_meta.insert("rso".to_string(), Parser::parse_rso(&rso).into());
        sos_meta.insert("server".to_string(), identity.server.clone().into());
        if let Some(id) = revision.changelist() {
            sos_meta.insert("changelist".to_string(), id.into());
        }

        let mut diffx = DiffX::new();
        diffx.meta.insert("scm".to_string(), "sos".into());
        diffx.meta.insert("sos".to_string(), Value::Object(sos_meta));

        let change = diffx.add_change(Map::new());
        for record in &records {
            if let Some(file) = self.file_section(record, scratch, engine)? {
                change.add_file(file);
            }
        }

        diffx.generate_stats();

        if diffx.changes.iter().all(|change| change.files.is_empty()) {
            return Ok(None);
        }

        Ok(Some((diffx, identity)))
    }

    /// Build the file section for one record
    ///
    /// Files whose content cannot be fetched are left out.
    fn file_section(
        &mut self,
        record: &ChangeRecord,
        scratch: &Scratch,
        engine: &DiffEngine,
    ) -> Result<Option<DiffXFile>, ScmError> {
        let old_name = record.old_path.as_deref().map(normalize_path);
        let new_name = record.new_path.as_deref().map(normalize_path);

        let path_info = match (old_name, new_name) {
            (Some(old), Some(new)) if old != new => json!({ "old": old, "new": new }),
            (old, new) => Value::from(new.or(old).unwrap_or_default()),
        };

        let mut file = DiffXFile::default();
        file.meta.insert("path".to_string(), path_info);

        let mut op = record.op;

        match record.kind {
            ObjectKind::File => {
                let old_label = match op {
                    ChangeOp::Create => DEV_NULL,
                    _ => old_name.unwrap_or(DEV_NULL),
                };
                let new_label = match op {
                    ChangeOp::Delete => DEV_NULL,
                    _ => new_name.unwrap_or(DEV_NULL),
                };

                if record.change_status != ChangeStatus::Unchanged || op == ChangeOp::Move {
                    let result = match self.diff_contents(record, scratch, engine) {
                        Ok(result) => result,
                        Err(e) => {
                            log::warn!(
                                "Unable to diff \"{}\". This file will not be included in \
                                 the diff. Error: {e}",
                                record.path()
                            );
                            return Ok(None);
                        }
                    };

                    if result.is_binary {
                        file.diff_type = Some(DiffType::Binary);
                    } else if result.has_text_differences && op == ChangeOp::Move {
                        op = ChangeOp::MoveModify;
                    }

                    file.diff = render_file_diff(&result, old_label, new_label);
                }
            }
            ObjectKind::Symlink => {
                let link = self.wa_root().join(record.path());

                match fs::read_link(&link) {
                    Ok(target) => {
                        file.meta.insert("type".to_string(), "symlink".into());
                        file.meta.insert(
                            "symlink target".to_string(),
                            target.to_string_lossy().into_owned().into(),
                        );
                    }
                    Err(e) => {
                        log::warn!(
                            "Unable to read symlink \"{}\". It will not be included in \
                             the diff. Error: {e}",
                            record.path()
                        );
                        return Ok(None);
                    }
                }
            }
            ObjectKind::Directory => return Ok(None),
        }

        file.meta.insert("op".to_string(), op.as_str().into());

        if let Some(ref revision) = record.old_revision {
            file.meta
                .insert("revision".to_string(), json!({ "old": revision.to_string() }));
        }

        if let Some(ref rev_id) = record.old_object_id {
            file.meta
                .insert("sos".to_string(), json!({ "rev_id": { "old": rev_id.to_json() } }));
        }

        Ok(Some(file))
    }

    /// Compare the old content of a record with what is in the workarea
    fn diff_contents(
        &mut self,
        record: &ChangeRecord,
        scratch: &Scratch,
        engine: &DiffEngine,
    ) -> Result<DiffResult, ScmError> {
        let old = fetch::old_content(self, scratch, record)?;

        let new = match record.op {
            ChangeOp::Delete => Vec::new(),
            _ => match fs::read(self.wa_root().join(record.path())) {
                Ok(content) => content,
                Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(e.into()),
            },
        };

        Ok(engine.diff_bytes(&old, &new))
    }
}

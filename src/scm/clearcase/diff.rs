//! Diff generation for ClearCase views
//!
//! Writes either DiffX with `versionvault` metadata or the legacy
//! concatenated unified diff.

use std::path::Path;

use serde_json::{Map, Value, json};

use crate::config::DiffOptions;
use crate::diff::{DEV_NULL, DiffEngine, DiffType, DiffX, DiffXFile, UnifiedWriter};
use crate::fetch::Scratch;
use crate::filter::PathFilter;
use crate::model::{ChangeOp, DiffResult};
use crate::scm::{Backend, DiffOutput, RevisionSpec, RunOptions, ScmError, ScmKind};

use super::changeset::VersionPair;
use super::constants::{commands, errors, flags, formats, host, prefixes, special};
use super::parser::Parser;
use super::{ChangesetEntry, ClearCaseClient, ClearCaseRevision};

/// Entries a directory version diff resolved to element paths and object IDs
#[derive(Debug, Default)]
struct DirectoryChanges {
    /// (new path, oid)
    added: Vec<(String, String)>,
    /// (old path, oid)
    deleted: Vec<(String, String)>,
    /// (old path, old oid, new path, new oid)
    renamed: Vec<(String, String, String, String)>,
}

/// Diff content of one element
struct ElementDiff {
    content: Vec<u8>,
    diff_type: DiffType,
}

impl Backend for ClearCaseClient {
    fn kind(&self) -> ScmKind {
        ScmKind::ClearCase
    }

    fn parse_revision_spec(&mut self, revisions: &[String]) -> Result<RevisionSpec, ScmError> {
        ClearCaseRevision::parse(revisions, self.view().view_type).map(RevisionSpec::ClearCase)
    }

    fn diff(
        &mut self,
        revisions: &RevisionSpec,
        options: &DiffOptions,
    ) -> Result<DiffOutput, ScmError> {
        let RevisionSpec::ClearCase(revision) = revisions else {
            return Err(ScmError::InvalidRevisionSpec(
                "Expected a ClearCase revision".to_string(),
            ));
        };

        if !options.include_files.is_empty() {
            return Err(ScmError::Unsupported(errors::INCLUDE_UNSUPPORTED.to_string()));
        }

        let filter = PathFilter::new(&[], &options.exclude_patterns)?;
        let engine = DiffEngine::new(options.context_lines);
        let scratch = Scratch::new()?;

        let changeset = self.changeset(revision)?;
        let changeset = self.sanitize_version_zero(changeset)?;
        let entries = self.process_directory_changes(changeset)?;

        log::debug!("Doing diff of changeset: {entries:?}");

        let diff = if self.is_legacy() {
            self.legacy_diff(entries, &filter, &scratch, &engine)?
        } else {
            self.diffx(revision, entries, &filter, &scratch, &engine)?
        };

        if diff.is_empty() {
            return Ok(DiffOutput::empty());
        }

        Ok(DiffOutput {
            diff,
            extra_data: None,
        })
    }
}

impl ClearCaseClient {
    /// Turn version pairs into entries, folding in directory changes
    ///
    /// Elements added, deleted or renamed in a changed directory either
    /// update the matching entry by object ID or are appended as new
    /// entries.
    fn process_directory_changes(
        &self,
        changeset: Vec<VersionPair>,
    ) -> Result<Vec<ChangesetEntry>, ScmError> {
        let mut entries = Vec::new();
        let mut directories = Vec::new();

        for (old, new) in changeset {
            if self.is_dir(&new)? {
                directories.push((old.clone(), new.clone()));
                entries.push(ChangesetEntry::directory(old, new));
            } else {
                entries.push(ChangesetEntry::modified(old, new));
            }
        }

        for (old_dir, new_dir) in &directories {
            let changes = self.directory_changes(old_dir, new_dir)?;

            for (path, oid) in changes.added {
                match position(&mut entries, |entry| Ok(entry.new_oid(self)? == oid))? {
                    Some(i) => entries[i].op = ChangeOp::Create,
                    None if !self.is_dir(&path)? => {
                        entries.push(ChangesetEntry::created(path, oid));
                    }
                    None => {}
                }
            }

            for (path, oid) in changes.deleted {
                match position(&mut entries, |entry| Ok(entry.old_oid(self)? == oid))? {
                    Some(i) => entries[i].op = ChangeOp::Delete,
                    None if !self.is_dir(&path)? => {
                        // the directory diff path has no version, which
                        // snapshot views cannot fetch
                        let selector = format!("{}{oid}", prefixes::OID);
                        let last = self
                            .run(&[
                                commands::LSHISTORY,
                                flags::LAST,
                                "1",
                                flags::FMT,
                                formats::EXTENDED_NAME,
                                &selector,
                            ])?
                            .trim()
                            .to_string();
                        entries.push(ChangesetEntry::deleted(last, oid));
                    }
                    None => {}
                }
            }

            for (old_file, old_oid, new_file, new_oid) in changes.renamed {
                let old_version = self.describe(formats::VERSION_NAME, &old_file)?;
                let old_path = format!("{old_file}{}{old_version}", special::EXTENDED_SEPARATOR);

                let found = position(&mut entries, |entry| {
                    Ok(entry.old_oid(self)? == old_oid || entry.new_oid(self)? == new_oid)
                })?;

                match found {
                    Some(i) => {
                        entries[i].old_path = Some(old_path);
                        entries[i].op = ChangeOp::Move;
                    }
                    None if !self.is_dir(&new_file)? => {
                        entries.push(ChangesetEntry::moved(old_path, old_oid, new_file, new_oid));
                    }
                    None => {}
                }
            }
        }

        Ok(entries)
    }

    /// Added, deleted and renamed entries between two directory versions
    fn directory_changes(
        &self,
        old_dir: &str,
        new_dir: &str,
    ) -> Result<DirectoryChanges, ScmError> {
        let output = self.run_with(
            &[commands::DIFF, flags::SERIAL, old_dir, new_dir],
            &RunOptions::default().ignoring(&[1]),
        )?;
        let diff = Parser::parse_directory_diff(&output);

        let mut changes = DirectoryChanges::default();

        for (old_name, new_name) in diff.renamed {
            let old_file = join_element(old_dir, &old_name);
            let new_file = join_element(new_dir, &new_name);
            let old_oid = self.object_id(&old_file)?;
            let new_oid = self.object_id(&new_file)?;
            changes.renamed.push((old_file, old_oid, new_file, new_oid));
        }

        for name in diff.added {
            let path = join_element(new_dir, &name);
            let oid = self.object_id(&path)?;
            changes.added.push((path, oid));
        }

        for name in diff.deleted {
            let path = join_element(old_dir, &name);
            let oid = self.object_id(&path)?;
            changes.deleted.push((path, oid));
        }

        Ok(changes)
    }

    /// Concatenated unified diffs with `====` object ID markers
    fn legacy_diff(
        &self,
        entries: Vec<ChangesetEntry>,
        filter: &PathFilter,
        scratch: &Scratch,
        engine: &DiffEngine,
    ) -> Result<Vec<u8>, ScmError> {
        let mut out = Vec::new();

        for mut entry in entries {
            if !self.is_included(&entry, filter) {
                continue;
            }

            if let Some(element) = self.element_diff(&mut entry, true, scratch, engine)? {
                out.extend_from_slice(&element.content);
            }
        }

        Ok(out)
    }

    /// One DiffX change holding every element of the changeset
    fn diffx(
        &mut self,
        revision: &ClearCaseRevision,
        entries: Vec<ChangesetEntry>,
        filter: &PathFilter,
        scratch: &Scratch,
        engine: &DiffEngine,
    ) -> Result<Vec<u8>, ScmError> {
        let meta = self.change_metadata(revision)?;

        let mut diffx = DiffX::new();
        let change = diffx.add_change(meta);

        for mut entry in entries {
            if !self.is_included(&entry, filter) {
                continue;
            }

            let Some(element) = self.element_diff(&mut entry, false, scratch, engine)? else {
                continue;
            };

            if let Some(file) = self.file_section(&mut entry, element)? {
                change.add_file(file);
            }
        }

        if diffx.changes.iter().all(|change| change.files.is_empty()) {
            return Ok(Vec::new());
        }

        diffx.generate_stats();
        diffx.to_bytes()
    }

    /// Whether the entry survives the exclude patterns
    fn is_included(&self, entry: &ChangesetEntry, filter: &PathFilter) -> bool {
        let Some(path) = entry.new_path.as_deref().or(entry.old_path.as_deref()) else {
            return false;
        };

        let element = path
            .split(special::EXTENDED_SEPARATOR)
            .next()
            .unwrap_or(path);

        filter.matches(&self.relative(element))
    }

    /// Diff one element, or `None` when it has to be left out
    fn element_diff(
        &self,
        entry: &mut ChangesetEntry,
        legacy: bool,
        scratch: &Scratch,
        engine: &DiffEngine,
    ) -> Result<Option<ElementDiff>, ScmError> {
        if entry.is_dir {
            return self.directory_diff(entry, legacy, engine).map(Some);
        }

        if let Some(ref new_path) = entry.new_path
            && !self.is_readable(new_path)
        {
            log::error!("File {new_path} does not exist or access is denied.");
            return Ok(None);
        }

        self.file_diff(entry, legacy, scratch, engine)
    }

    fn file_diff(
        &self,
        entry: &mut ChangesetEntry,
        legacy: bool,
        scratch: &Scratch,
        engine: &DiffEngine,
    ) -> Result<Option<ElementDiff>, ScmError> {
        let label = |path: Option<&str>| match path {
            Some(path) if legacy => Path::new(self.vobtag())
                .join(self.relative(path))
                .to_string_lossy()
                .into_owned(),
            Some(path) => self.relative(path),
            None => DEV_NULL.to_string(),
        };
        let old_label = label(entry.old_path.as_deref());
        let new_label = label(entry.new_path.as_deref());

        let contents = self
            .content(entry.old_path.as_deref(), scratch)
            .and_then(|old| Ok((old, self.content(entry.new_path.as_deref(), scratch)?)));

        let (old, new) = match contents {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!(
                    "Unable to fetch the content of {}. It will not be included in the \
                     diff. Error: {e}",
                    entry.new_path.as_deref().or(entry.old_path.as_deref()).unwrap_or_default()
                );
                return Ok(None);
            }
        };

        let result = engine.diff_bytes(&old, &new);

        let index_line = if legacy {
            Some(index_line(entry, self)?)
        } else {
            None
        };

        Ok(Some(ElementDiff {
            content: render_element_diff(&result, &old_label, &new_label, index_line.as_deref()),
            diff_type: if result.is_binary {
                DiffType::Binary
            } else {
                DiffType::Text
            },
        }))
    }

    /// Diff the sorted entry names of two directory versions
    fn directory_diff(
        &self,
        entry: &mut ChangesetEntry,
        legacy: bool,
        engine: &DiffEngine,
    ) -> Result<ElementDiff, ScmError> {
        let old = self.directory_listing(entry.old_path.as_deref())?;
        let new = self.directory_listing(entry.new_path.as_deref())?;
        let result = engine.diff_bytes(&old, &new);

        let old_label = entry.old_path.clone().unwrap_or_else(|| DEV_NULL.to_string());
        let new_label = entry.new_path.clone().unwrap_or_else(|| DEV_NULL.to_string());

        let index_line = if legacy {
            Some(index_line(entry, self)?)
        } else {
            None
        };

        Ok(ElementDiff {
            content: render_element_diff(&result, &old_label, &new_label, index_line.as_deref()),
            diff_type: DiffType::Text,
        })
    }

    /// File section with `versionvault` metadata for one element
    fn file_section(
        &self,
        entry: &mut ChangesetEntry,
        element: ElementDiff,
    ) -> Result<Option<DiffXFile>, ScmError> {
        let Some(vob_target) = entry.new_path.clone().or_else(|| entry.old_path.clone()) else {
            return Ok(None);
        };
        let vob_oid = self.describe(formats::OBJECT_ID, &format!("{}{vob_target}", prefixes::VOB))?;

        let old_rel = entry.old_path.as_deref().map(|path| self.relative(path));
        let new_rel = entry.new_path.as_deref().map(|path| self.relative(path));

        let mut vv_meta = Map::new();
        vv_meta.insert("vob".to_string(), vob_oid.into());

        let mut op = entry.op;

        let (path, revision) = match (op, old_rel, new_rel) {
            (ChangeOp::Create, _, Some(new_rel)) => {
                vv_meta.insert("new".to_string(), self.new_side(entry, &new_rel)?);
                (
                    Value::from(new_rel),
                    json!({ "new": entry.new_version(self)? }),
                )
            }
            (ChangeOp::Delete, Some(old_rel), _) => {
                vv_meta.insert("old".to_string(), self.old_side(entry, &old_rel)?);
                (
                    Value::from(old_rel),
                    json!({ "old": entry.old_version(self)? }),
                )
            }
            (ChangeOp::Modify | ChangeOp::Move, Some(old_rel), Some(new_rel)) => {
                vv_meta.insert("old".to_string(), self.old_side(entry, &old_rel)?);
                vv_meta.insert("new".to_string(), self.new_side(entry, &new_rel)?);

                if op == ChangeOp::Move && !entry.is_dir && !element.content.is_empty() {
                    op = ChangeOp::MoveModify;
                }

                (
                    json!({ "old": old_rel, "new": new_rel }),
                    json!({
                        "old": entry.old_version(self)?,
                        "new": entry.new_version(self)?,
                    }),
                )
            }
            _ => {
                log::warn!(
                    "Unexpected operation \"{}\" for {} {}",
                    entry.op,
                    entry.old_path.as_deref().unwrap_or_default(),
                    entry.new_path.as_deref().unwrap_or_default()
                );
                return Ok(None);
            }
        };

        let mut file = DiffXFile {
            diff: element.content,
            diff_type: Some(element.diff_type),
            ..Default::default()
        };

        if entry.is_dir {
            vv_meta.insert("directory-diff".to_string(), "legacy-filenames".into());
        }

        file.meta.insert("op".to_string(), op.as_str().into());
        file.meta.insert("path".to_string(), path);
        file.meta.insert("revision".to_string(), revision);
        file.meta.insert(
            "type".to_string(),
            if entry.is_dir { "directory" } else { "file" }.into(),
        );
        file.meta.insert("versionvault".to_string(), Value::Object(vv_meta));

        Ok(Some(file))
    }

    fn old_side(&self, entry: &mut ChangesetEntry, path: &str) -> Result<Value, ScmError> {
        Ok(json!({
            "name": entry.old_name(self)?,
            "oid": entry.old_oid(self)?,
            "path": path,
        }))
    }

    fn new_side(&self, entry: &mut ChangesetEntry, path: &str) -> Result<Value, ScmError> {
        Ok(json!({
            "name": entry.new_name(self)?,
            "oid": entry.new_oid(self)?,
            "path": path,
        }))
    }

    /// Change-level `versionvault` metadata
    fn change_metadata(
        &mut self,
        revision: &ClearCaseRevision,
    ) -> Result<Map<String, Value>, ScmError> {
        let view = json!({
            "tag": self.view_name(),
            "type": self.view().view_type.to_string(),
            "ucm": self.view().is_ucm,
        });

        let host_info = self.host_properties()?;
        let property = |key: &str| host_info.get(key).cloned().map_or(Value::Null, Value::from);

        let versionvault = json!({
            "os": {
                "short": special::OS_SHORT,
                "long": property(host::OPERATING_SYSTEM),
            },
            "region": property(host::REGION),
            "scm": {
                "name": property(host::PRODUCT_NAME),
                "version": property(host::PRODUCT_VERSION),
            },
            "view": view,
            "scope": revision.scope(),
        });

        let mut meta = Map::new();
        meta.insert("versionvault".to_string(), versionvault);
        Ok(meta)
    }
}

/// Index of the first entry matching `matches`
fn position(
    entries: &mut [ChangesetEntry],
    mut matches: impl FnMut(&mut ChangesetEntry) -> Result<bool, ScmError>,
) -> Result<Option<usize>, ScmError> {
    for (i, entry) in entries.iter_mut().enumerate() {
        if matches(entry)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// `====` marker naming the old and new object IDs
fn index_line(entry: &mut ChangesetEntry, client: &ClearCaseClient) -> Result<String, ScmError> {
    Ok(format!(
        "==== {} {} ====\n",
        entry.old_oid(client)?,
        entry.new_oid(client)?
    ))
}

/// Path of an entry inside a directory version
fn join_element(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Render a unified diff, placing the legacy marker line when given
///
/// The marker follows the file headers, or precedes the binary notice.
fn render_element_diff(
    result: &DiffResult,
    old_label: &str,
    new_label: &str,
    index_line: Option<&str>,
) -> Vec<u8> {
    let mut writer = UnifiedWriter::new();

    if result.is_binary {
        if let Some(line) = index_line {
            writer.write_raw(line.as_bytes());
        }
        writer.write_binary_differs(old_label, new_label);
    } else if result.has_text_differences {
        writer.write_file_headers(old_label, new_label);
        if let Some(line) = index_line {
            writer.write_raw(line.as_bytes());
        }
        for hunk in &result.hunks {
            writer.write_hunk(hunk);
        }
    }

    writer.into_bytes()
}

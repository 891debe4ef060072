//! Regeneration of `browser.html` so that it loads the mod's styles and scripts.
//!
//! The live entry point is always rebuilt from its `.bak` copy, never from itself.
//! Rebuilding from the pristine vendor file makes the result depend only on the
//! current instruction set, so running the patcher again never stacks up duplicate
//! `<link>` or `<script>` tags.
//!
//! The markup is streamed through `quick_xml` with end-name checks disabled, which is
//! lenient enough for the HTML Vivaldi ships (void elements, doctype, unquoted
//! structure). New `<link rel="stylesheet">` elements go at the end of `<head>`, new
//! `<script>` elements at the end of `<body>`.

use crate::models::{ENTRY_POINT_FILE, Instruction};
use crate::services::backup::{self, backup_path};
use crate::services::paths;
use crate::services::report::{PATCH_LOG_TARGET, PatchError, PatchReport};
use crate::services::version_dirs::{RESOURCES_DIR, VIVALDI_DIR};
use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashSet;
use std::fs;

/// Directory of the entry point, relative to a version directory.
pub fn entry_point_dir() -> String {
    format!("{}/{}", RESOURCES_DIR, VIVALDI_DIR)
}

/// Absolute path of the entry point inside `version_dir`.
pub fn entry_point_path(version_dir: &Utf8Path) -> Utf8PathBuf {
    version_dir
        .join(RESOURCES_DIR)
        .join(VIVALDI_DIR)
        .join(ENTRY_POINT_FILE)
}

/// Style and script references to add to the entry point, relative to its directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntryPointAssets {
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
}

impl EntryPointAssets {
    /// Collect the assets of all instructions not excluded from the entry point.
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        let base = entry_point_dir();
        let mut assets = Self::default();

        for instruction in instructions.iter().filter(|i| !i.exclude_from_entry_point) {
            if instruction.is_style() {
                assets
                    .styles
                    .push(paths::relative_to(&base, &instruction.target_file()));
            } else if instruction.is_script() {
                assets
                    .scripts
                    .push(paths::relative_to(&base, &instruction.target_file()));
            }
        }

        assets
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.scripts.is_empty()
    }
}

/// Rebuild the entry point of `version_dir` for `instructions`.
///
/// # Returns
/// `true` when the entry point is up to date afterwards (including when nothing had
/// to be done); `false` when something failed, with the reason added to `report`
pub fn regenerate(
    version_dir: &Utf8Path,
    instructions: &[Instruction],
    report: &mut PatchReport,
) -> bool {
    if instructions.iter().any(Instruction::replaces_entry_point) {
        tracing::debug!("Instructions replace {}, not generating it", ENTRY_POINT_FILE);
        return true;
    }

    let assets = EntryPointAssets::from_instructions(instructions);
    if assets.is_empty() {
        return true;
    }

    let entry_point = entry_point_path(version_dir);
    if !entry_point.exists() {
        report.error(
            format!("Could not add mod files to {}", ENTRY_POINT_FILE),
            Some(PatchError::MissingEntryPoint(entry_point)),
        );
        return false;
    }

    if let Err(e) = backup::backup_file(&entry_point) {
        report.warning(
            format!("Could not back up {}, so it will not be modified", ENTRY_POINT_FILE),
            Some(e),
        );
        return false;
    }

    let backup = backup_path(&entry_point);
    let original = match fs::read_to_string(&backup) {
        Ok(content) => content,
        Err(e) => {
            report.warning(
                format!("Could not read {}", backup),
                Some(PatchError::io("read", &backup, e)),
            );
            return false;
        }
    };

    let augmented = match augment_markup(&original, &assets) {
        Ok(markup) => markup,
        Err(e) => {
            report.warning(
                format!("Could not read {}", backup),
                Some(PatchError::Markup {
                    path: backup,
                    message: format!("{:#}", e),
                }),
            );
            return false;
        }
    };

    if let Err(e) = fs::write(&entry_point, augmented) {
        report.warning(
            format!("Could not save the modified {}", entry_point),
            Some(PatchError::io("write", &entry_point, e)),
        );
        return false;
    }

    tracing::info!(
        target: PATCH_LOG_TARGET,
        "[+] Added {} styles and {} scripts to {}",
        assets.styles.len(),
        assets.scripts.len(),
        ENTRY_POINT_FILE
    );
    true
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Head,
    Body,
}

/// Stream `html` through, adding the missing asset references.
///
/// A style is missing when no element in `<head>` carries its path as an attribute
/// value, a script when no element in `<body>` does. Documents without a head or body
/// get one.
pub fn augment_markup(html: &str, assets: &EntryPointAssets) -> Result<String> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut writer = Writer::new(Vec::new());
    let mut section = Section::Outside;
    let mut head_refs: HashSet<String> = HashSet::new();
    let mut body_refs: HashSet<String> = HashSet::new();
    let mut seen_head = false;
    let mut seen_body = false;
    let mut styles_written = false;
    let mut scripts_written = false;

    loop {
        let event = reader.read_event()?;

        match &event {
            Event::Start(e) => match tag_name(e.name().as_ref()).as_str() {
                "head" => {
                    seen_head = true;
                    section = Section::Head;
                }
                "body" => {
                    if !styles_written {
                        write_missing_styles(&mut writer, assets, &head_refs, !seen_head)?;
                        styles_written = true;
                    }
                    seen_body = true;
                    section = Section::Body;
                }
                _ => collect_references(e, section, &mut head_refs, &mut body_refs),
            },
            Event::Empty(e) => match tag_name(e.name().as_ref()).as_str() {
                "head" if !styles_written => {
                    seen_head = true;
                    write_missing_styles(&mut writer, assets, &head_refs, true)?;
                    styles_written = true;
                    continue;
                }
                "body" if !scripts_written => {
                    if !styles_written {
                        write_missing_styles(&mut writer, assets, &head_refs, !seen_head)?;
                        styles_written = true;
                    }
                    seen_body = true;
                    write_missing_scripts(&mut writer, assets, &body_refs, true)?;
                    scripts_written = true;
                    continue;
                }
                _ => collect_references(e, section, &mut head_refs, &mut body_refs),
            },
            Event::End(e) => match tag_name(e.name().as_ref()).as_str() {
                "head" => {
                    if !styles_written {
                        write_missing_styles(&mut writer, assets, &head_refs, false)?;
                        styles_written = true;
                    }
                    section = Section::Outside;
                }
                "body" => {
                    if !scripts_written {
                        write_missing_scripts(&mut writer, assets, &body_refs, false)?;
                        scripts_written = true;
                    }
                    section = Section::Outside;
                }
                "html" => {
                    if !styles_written {
                        write_missing_styles(&mut writer, assets, &head_refs, true)?;
                        styles_written = true;
                    }
                    if !scripts_written {
                        write_missing_scripts(&mut writer, assets, &body_refs, !seen_body)?;
                        scripts_written = true;
                    }
                }
                _ => {}
            },
            Event::Eof => {
                if !styles_written {
                    write_missing_styles(&mut writer, assets, &head_refs, !seen_head)?;
                }
                if !scripts_written {
                    write_missing_scripts(&mut writer, assets, &body_refs, !seen_body)?;
                }
                break;
            }
            _ => {}
        }

        writer.write_event(event)?;
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn tag_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

/// Remember the `href`/`src` values of an element for de-duplication.
fn collect_references(
    element: &BytesStart<'_>,
    section: Section,
    head_refs: &mut HashSet<String>,
    body_refs: &mut HashSet<String>,
) {
    let refs = match section {
        Section::Head => head_refs,
        Section::Body => body_refs,
        Section::Outside => return,
    };

    for attr in element.html_attributes().flatten() {
        let key = attr.key.as_ref().to_ascii_lowercase();
        if key == b"href" || key == b"src" {
            if let Ok(value) = attr.unescape_value() {
                refs.insert(value.into_owned());
            }
        }
    }
}

fn write_missing_styles(
    writer: &mut Writer<Vec<u8>>,
    assets: &EntryPointAssets,
    existing: &HashSet<String>,
    wrap_in_head: bool,
) -> Result<()> {
    if wrap_in_head {
        writer.write_event(Event::Start(BytesStart::new("head")))?;
    }

    for style in assets.styles.iter().filter(|s| !existing.contains(*s)) {
        let mut link = BytesStart::new("link");
        link.push_attribute(("rel", "stylesheet"));
        link.push_attribute(("href", style.as_str()));
        writer.write_event(Event::Empty(link))?;
    }

    if wrap_in_head {
        writer.write_event(Event::End(BytesEnd::new("head")))?;
    }
    Ok(())
}

fn write_missing_scripts(
    writer: &mut Writer<Vec<u8>>,
    assets: &EntryPointAssets,
    existing: &HashSet<String>,
    wrap_in_body: bool,
) -> Result<()> {
    if wrap_in_body {
        writer.write_event(Event::Start(BytesStart::new("body")))?;
    }

    for script in assets.scripts.iter().filter(|s| !existing.contains(*s)) {
        let mut element = BytesStart::new("script");
        element.push_attribute(("src", script.as_str()));
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::End(BytesEnd::new("script")))?;
    }

    if wrap_in_body {
        writer.write_event(Event::End(BytesEnd::new("body")))?;
    }
    Ok(())
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use vox_codec::edit::EditDetail;
use vox_core::types::PacketType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Set,
    SetDestructive,
    Erase,
}

impl EditKind {
    pub fn packet_type(self) -> PacketType {
        match self {
            Self::Set => PacketType::SetVoxel,
            Self::SetDestructive => PacketType::SetVoxelDestructive,
            Self::Erase => PacketType::EraseVoxel,
        }
    }
}

/// One scripted edit. `immediate` edits skip batching.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEdit {
    pub kind: EditKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub s: f32,
    #[serde(default)]
    pub color: [u8; 3],
    #[serde(default)]
    pub immediate: bool,
}

impl ScriptEdit {
    pub fn detail(&self) -> EditDetail {
        let [red, green, blue] = self.color;
        EditDetail {
            x: self.x,
            y: self.y,
            z: self.z,
            s: self.s,
            red,
            green,
            blue,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditScript {
    #[serde(default)]
    pub repeat: u32,
    #[serde(default)]
    pub edit: Vec<ScriptEdit>,
}

impl EditScript {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid edit script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading edit script {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Passes over the script; at least one.
    pub fn passes(&self) -> u32 {
        self.repeat.max(1)
    }

    /// Consecutive batchable edits of one kind, or a single immediate edit.
    pub fn runs(&self) -> Vec<EditRun> {
        let mut runs: Vec<EditRun> = Vec::new();
        for edit in &self.edit {
            let packet_type = edit.kind.packet_type();
            match runs.last_mut() {
                Some(run) if !edit.immediate && !run.immediate && run.packet_type == packet_type => {
                    run.details.push(edit.detail());
                }
                _ => runs.push(EditRun {
                    packet_type,
                    immediate: edit.immediate,
                    details: vec![edit.detail()],
                }),
            }
        }
        runs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditRun {
    pub packet_type: PacketType,
    pub immediate: bool,
    pub details: Vec<EditDetail>,
}

//! Shader programs built from per-stage WGSL files.
//!
//! A program goes created -> stages attached -> linked, and ends either `Valid` or
//! `Invalid`. Stages are parsed and validated with naga when attached; linking checks
//! that exactly one vertex and one fragment stage exist and that every fragment input
//! location is produced by the vertex stage. Only a `Valid` program hands out GPU modules.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{validation_scope, RenderError};

/// Programs the renderer needs, loaded from `<dir>/<name>.vert.wgsl` and `<dir>/<name>.frag.wgsl`.
pub const PROGRAM_NAMES: [&str; 5] = ["shadow", "gbuffer", "reflection", "global_lighting", "present"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            StageKind::Vertex => naga::ShaderStage::Vertex,
            StageKind::Fragment => naga::ShaderStage::Fragment,
        }
    }

    pub fn file_suffix(self) -> &'static str {
        match self {
            StageKind::Vertex => "vert.wgsl",
            StageKind::Fragment => "frag.wgsl",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramState {
    Created,
    StagesAttached,
    Valid,
    Invalid,
}

struct CompiledStage {
    kind: StageKind,
    path: PathBuf,
    source: String,
    module: naga::Module,
    entry_point: String,
}

/// GPU modules of a linked program, ready for pipeline creation.
pub struct ProgramModules {
    pub vertex: wgpu::ShaderModule,
    pub vertex_entry: String,
    pub fragment: wgpu::ShaderModule,
    pub fragment_entry: String,
}

pub struct ShaderProgram {
    label: String,
    stages: Vec<CompiledStage>,
    state: ProgramState,
}

impl ShaderProgram {
    pub fn create(label: &str) -> Self {
        Self { label: label.to_string(), stages: Vec::new(), state: ProgramState::Created }
    }

    pub fn label(&self) -> &str { &self.label }
    pub fn state(&self) -> ProgramState { self.state }
    pub fn is_valid(&self) -> bool { self.state == ProgramState::Valid }

    /// Read, parse and validate one stage from a WGSL file.
    pub fn attach_stage(&mut self, path: &Path, kind: StageKind) -> Result<(), RenderError> {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(source) => {
                self.state = ProgramState::Invalid;
                log::error!("shader '{}': cannot read {}: {source}", self.label, path.display());
                return Err(RenderError::Io { path: path.to_path_buf(), source });
            }
        };
        self.attach_source(path, source, kind)
    }

    /// Compile a stage from source already in memory; `path` names it in diagnostics.
    pub fn attach_source(&mut self, path: &Path, source: String, kind: StageKind) -> Result<(), RenderError> {
        match compile_stage(path, &source, kind) {
            Ok((module, entry_point)) => {
                log::debug!("shader '{}': compiled {} ({entry_point})", self.label, path.display());
                self.stages.push(CompiledStage { kind, path: path.to_path_buf(), source, module, entry_point });
                if self.state == ProgramState::Created {
                    self.state = ProgramState::StagesAttached;
                }
                Ok(())
            }
            Err(log) => {
                self.state = ProgramState::Invalid;
                log::error!("shader '{}': compile log for {}:\n{log}", self.label, path.display());
                Err(RenderError::ShaderCompile { path: path.to_path_buf(), log })
            }
        }
    }

    pub fn link(&mut self) -> Result<(), RenderError> {
        match self.check_link() {
            Ok(()) => {
                self.state = ProgramState::Valid;
                log::info!("shader program '{}' linked", self.label);
                Ok(())
            }
            Err(log) => {
                self.state = ProgramState::Invalid;
                log::error!("shader program '{}' link log: {log}", self.label);
                Err(RenderError::ShaderLink { program: self.label.clone(), log })
            }
        }
    }

    fn check_link(&self) -> Result<(), String> {
        if self.state == ProgramState::Invalid {
            return Err("a stage failed to compile".to_string());
        }
        let stage = |kind: StageKind| -> Result<&CompiledStage, String> {
            let mut found = self.stages.iter().filter(|s| s.kind == kind);
            match (found.next(), found.next()) {
                (Some(s), None) => Ok(s),
                (None, _) => Err(format!("no {kind:?} stage attached")),
                (Some(_), Some(_)) => Err(format!("more than one {kind:?} stage attached")),
            }
        };
        let vs = stage(StageKind::Vertex)?;
        let fs = stage(StageKind::Fragment)?;
        let produced = vertex_outputs(vs);
        let consumed = fragment_inputs(fs);
        let missing: Vec<u32> = consumed.difference(&produced).copied().collect();
        if !missing.is_empty() {
            return Err(format!(
                "fragment stage {} reads locations {missing:?} that vertex stage {} does not write",
                fs.path.display(),
                vs.path.display()
            ));
        }
        Ok(())
    }

    /// Create the wgpu modules; only a linked program may be used for drawing.
    pub fn create_modules(&self, device: &wgpu::Device) -> Result<ProgramModules, RenderError> {
        if !self.is_valid() {
            return Err(RenderError::ShaderNotLinked(self.label.clone()));
        }
        let get = |kind| {
            self.stages
                .iter()
                .find(|s| s.kind == kind)
                .ok_or_else(|| RenderError::ShaderNotLinked(self.label.clone()))
        };
        let (vs, fs) = (get(StageKind::Vertex)?, get(StageKind::Fragment)?);
        let make = |stage: &CompiledStage| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{}_{}", self.label, stage.kind.file_suffix())),
                source: wgpu::ShaderSource::Wgsl(stage.source.as_str().into()),
            })
        };
        let (vertex, fragment) = validation_scope(device, &self.label, || (make(vs), make(fs)))?;
        Ok(ProgramModules {
            vertex,
            vertex_entry: vs.entry_point.clone(),
            fragment,
            fragment_entry: fs.entry_point.clone(),
        })
    }
}

fn compile_stage(path: &Path, source: &str, kind: StageKind) -> Result<(naga::Module, String), String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::default())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == kind.naga_stage())
        .map(|ep| ep.name.clone())
        .ok_or_else(|| format!("{} has no {kind:?} entry point", path.display()))?;
    Ok((module, entry))
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeSet<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location);
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    if let Some(naga::Binding::Location { location, .. }) = &m.binding {
                        out.insert(*location);
                    }
                }
            }
        }
    }
}

fn entry<'a>(stage: &'a CompiledStage) -> Option<&'a naga::EntryPoint> {
    stage.module.entry_points.iter().find(|ep| ep.name == stage.entry_point)
}

fn vertex_outputs(stage: &CompiledStage) -> BTreeSet<u32> {
    let mut out = BTreeSet::new();
    if let Some(result) = entry(stage).and_then(|ep| ep.function.result.as_ref()) {
        collect_locations(&stage.module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

fn fragment_inputs(stage: &CompiledStage) -> BTreeSet<u32> {
    let mut out = BTreeSet::new();
    if let Some(ep) = entry(stage) {
        for arg in &ep.function.arguments {
            collect_locations(&stage.module, arg.ty, arg.binding.as_ref(), &mut out);
        }
    }
    out
}

/// Every program the renderer draws with, compiled and linked up front.
pub struct ShaderLibrary {
    programs: HashMap<String, ShaderProgram>,
}

impl ShaderLibrary {
    pub fn load(dir: &Path) -> Result<Self, RenderError> {
        let mut programs = HashMap::new();
        for name in PROGRAM_NAMES {
            let mut program = ShaderProgram::create(name);
            for kind in [StageKind::Vertex, StageKind::Fragment] {
                program.attach_stage(&dir.join(format!("{name}.{}", kind.file_suffix())), kind)?;
            }
            program.link()?;
            programs.insert(name.to_string(), program);
        }
        Ok(Self { programs })
    }

    pub fn program(&self, name: &str) -> Result<&ShaderProgram, RenderError> {
        self.programs
            .get(name)
            .filter(|p| p.is_valid())
            .ok_or_else(|| RenderError::ShaderNotLinked(name.to_string()))
    }

    pub fn modules(&self, device: &wgpu::Device, name: &str) -> Result<ProgramModules, RenderError> {
        self.program(name)?.create_modules(device)
    }
}

//! Whole-program model: every parsed unit in one arena plus an index of
//! declared types keyed by qualified name.

use crate::ast::{Ast, NodeId, NodeKind, NodeVariant};
use crate::output::{unit_path, write_unit, OutputError, WriteOutcome};
use crate::printer::{print, print_unit, print_unit_header};
use crate::query::QueryError;
use crate::syntax::{parse_unit, ParseError, SourceUnit};
use crate::validate::{check_java, SyntaxCheckError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("type '{name}' is declared in both {first} and {second}")]
    DuplicateType {
        name: String,
        first: String,
        second: String,
    },

    #[error("printed {unit} is not valid Java: {source}")]
    Validation {
        unit: String,
        #[source]
        source: SyntaxCheckError,
    },

    #[error("no output directory configured")]
    MissingOutputDir,

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Whether a unit is transformed and printed, or only indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    Input,
    Classpath,
}

#[derive(Debug, Clone)]
pub struct ProjectUnit {
    pub name: String,
    pub path: Option<PathBuf>,
    pub root: NodeId,
    pub role: UnitRole,
}

/// A unit rendered for output, with its path relative to the output
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedUnit {
    pub unit: String,
    pub relative_path: PathBuf,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ProjectBuilder {
    inputs: Vec<PathBuf>,
    virtual_units: Vec<SourceUnit>,
    classpath: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    validate_output: bool,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `.java` file, or a directory searched recursively for them.
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn virtual_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.virtual_units.push(SourceUnit::virtual_file(name, text));
        self
    }

    /// Sources that resolve references but are never printed.
    pub fn source_classpath(mut self, path: impl Into<PathBuf>) -> Self {
        self.classpath.push(path.into());
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Check printed text with tree-sitter before writing it.
    pub fn validate_output(mut self, validate: bool) -> Self {
        self.validate_output = validate;
        self
    }

    pub fn build(self) -> Result<Project, ProjectError> {
        let mut project = Project {
            ast: Ast::new(),
            units: Vec::new(),
            types: BTreeMap::new(),
            output_dir: self.output_dir,
            validate_output: self.validate_output,
        };

        for path in &self.inputs {
            for unit in discover(path)? {
                project.add_unit(unit, UnitRole::Input)?;
            }
        }
        for unit in self.virtual_units {
            project.add_unit(unit, UnitRole::Input)?;
        }
        for path in &self.classpath {
            for unit in discover(path)? {
                project.add_unit(unit, UnitRole::Classpath)?;
            }
        }

        tracing::debug!(
            units = project.units.len(),
            types = project.types.len(),
            "built project model"
        );
        Ok(project)
    }
}

/// Read `path` as one unit, or every `.java` file below it in name order.
fn discover(path: &Path) -> Result<Vec<SourceUnit>, ProjectError> {
    let read = |path: &Path| {
        SourceUnit::read(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    if !path.is_dir() {
        return Ok(vec![read(path)?]);
    }

    let mut units = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|err| ProjectError::Io {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        let is_java = entry.path().extension().is_some_and(|ext| ext == "java");
        if entry.file_type().is_file() && is_java {
            units.push(read(entry.path())?);
        }
    }
    Ok(units)
}

/// Parsed sources sharing one arena.
#[derive(Debug)]
pub struct Project {
    ast: Ast,
    units: Vec<ProjectUnit>,
    /// Qualified name to declaration.
    types: BTreeMap<String, NodeId>,
    output_dir: Option<PathBuf>,
    validate_output: bool,
}

impl Project {
    pub fn builder() -> ProjectBuilder {
        ProjectBuilder::new()
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    pub fn units(&self) -> &[ProjectUnit] {
        &self.units
    }

    pub fn input_units(&self) -> impl Iterator<Item = &ProjectUnit> {
        self.units.iter().filter(|unit| unit.role == UnitRole::Input)
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Parse another unit into the model.
    pub fn add_unit(&mut self, unit: SourceUnit, role: UnitRole) -> Result<NodeId, ProjectError> {
        let root = parse_unit(&mut self.ast, &unit)?;
        tracing::debug!(unit = %unit.name, ?role, "parsed unit");

        let declared: Vec<NodeId> = self
            .ast
            .elements(root, |ast: &Ast, node: NodeId| ast.variant(node).is_type())
            .collect();
        for ty in declared {
            let Some(name) = self.ast.qualified_name(ty) else {
                continue;
            };
            if let Some(existing) = self.types.get(&name) {
                let first = self.unit_name_of(*existing).unwrap_or_default();
                let existing_role = self.unit_role_of(*existing);
                if role == UnitRole::Classpath || existing_role == Some(UnitRole::Classpath) {
                    // Inputs shadow classpath declarations.
                    tracing::debug!(%name, shadowed = %first, "type shadowed");
                    if role == UnitRole::Input {
                        self.types.insert(name, ty);
                    }
                    continue;
                }
                return Err(ProjectError::DuplicateType {
                    name,
                    first,
                    second: unit.name.clone(),
                });
            }
            self.types.insert(name, ty);
        }

        self.units.push(ProjectUnit {
            name: unit.name,
            path: unit.path,
            root,
            role,
        });
        Ok(root)
    }

    fn unit_of(&self, node: NodeId) -> Option<&ProjectUnit> {
        let root = self.ast.compilation_unit_of(node)?;
        self.units.iter().find(|unit| unit.root == root)
    }

    fn unit_name_of(&self, node: NodeId) -> Option<String> {
        self.unit_of(node).map(|unit| unit.name.clone())
    }

    fn unit_role_of(&self, node: NodeId) -> Option<UnitRole> {
        self.unit_of(node).map(|unit| unit.role)
    }

    /// Indexed types in qualified-name order.
    pub fn types(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.types.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Look a type up by qualified name, or by simple name when `name` has
    /// no dots. Simple names resolve to the first match in qualified-name
    /// order.
    pub fn find_type(&self, name: &str) -> Option<NodeId> {
        if let Some(id) = self.types.get(name) {
            return Some(*id);
        }
        if name.contains('.') {
            return None;
        }
        self.types
            .values()
            .copied()
            .find(|id| self.ast.simple_name(*id) == Some(name))
    }

    pub fn get_type(&self, name: &str) -> Result<NodeId, QueryError> {
        self.find_type(name).ok_or_else(|| {
            let suggestion = self
                .types
                .keys()
                .map(|candidate| {
                    let simple = candidate.rsplit('.').next().unwrap_or(candidate);
                    (strsim::jaro_winkler(name, simple), simple)
                })
                .filter(|(score, _)| *score >= 0.8)
                .max_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, simple)| simple.to_string());
            QueryError::ElementNotFound {
                variant: NodeVariant::Class,
                name: name.to_string(),
                suggestion,
            }
        })
    }

    /// First pre-order match across the input units, in load order.
    pub fn find_named(&self, variant: NodeVariant, name: &str) -> Option<NodeId> {
        self.input_units()
            .find_map(|unit| self.ast.find_named(unit.root, variant, name))
    }

    /// Package and imports of the declaring unit followed by the type
    /// itself, ready to hand to an oracle.
    pub fn standalone_source(&self, ty: NodeId) -> String {
        let mut text = self
            .ast
            .compilation_unit_of(ty)
            .map(|unit| print_unit_header(&self.ast, unit))
            .unwrap_or_default();
        text.push_str(&print(&self.ast, ty));
        text.push('\n');
        text
    }

    /// Render every input unit.
    pub fn printed_units(&self) -> Vec<PrintedUnit> {
        self.input_units()
            .map(|unit| PrintedUnit {
                unit: unit.name.clone(),
                relative_path: self.relative_path(unit),
                text: print_unit(&self.ast, unit.root),
            })
            .collect()
    }

    /// Output location of a unit: its package path and the first public
    /// type it declares, falling back to the first type or the file stem.
    fn relative_path(&self, unit: &ProjectUnit) -> PathBuf {
        let NodeKind::CompilationUnit { package, types, .. } = self.ast.kind(unit.root) else {
            return PathBuf::from(&unit.name);
        };
        let public = types.iter().copied().find(|ty| {
            crate::ast::HasModifiers::modifiers(self.ast.kind(*ty))
                .is_some_and(|mods| mods.contains(&crate::ast::ModifierKind::Public))
        });
        let stem = Path::new(&unit.name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| unit.name.clone());
        let type_name = public
            .or_else(|| types.first().copied())
            .and_then(|ty| self.ast.simple_name(ty))
            .map(str::to_string)
            .unwrap_or(stem);
        unit_path(package.as_deref(), &type_name)
    }

    /// Print every input unit under the output directory.
    pub fn pretty_print(&self) -> Result<Vec<WriteOutcome>, ProjectError> {
        let dir = self.output_dir.as_ref().ok_or(ProjectError::MissingOutputDir)?;
        let mut outcomes = Vec::new();
        for printed in self.printed_units() {
            if self.validate_output {
                check_java(&printed.text).map_err(|source| ProjectError::Validation {
                    unit: printed.unit.clone(),
                    source,
                })?;
            }
            outcomes.push(write_unit(&dir.join(&printed.relative_path), &printed.text)?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FOO: &str = "package transformation;\n\npublic class Foo1 implements IFoo {\n    public int m() {\n        return 3 + 2;\n    }\n}\n";
    const IFOO: &str = "package transformation;\n\npublic interface IFoo {\n    int m();\n}\n";

    #[test]
    fn indexes_inputs_and_classpath() {
        let project = Project::builder()
            .virtual_file("Foo1.java", FOO)
            .virtual_file("Extra.java", "class Helper { class Inner {} }")
            .build()
            .unwrap();
        let names: Vec<&str> = project.types().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Helper", "Helper.Inner", "transformation.Foo1"]);
        assert_eq!(project.find_type("Foo1"), project.find_type("transformation.Foo1"));
        assert!(project.find_type("other.Foo1").is_none());
    }

    #[test]
    fn duplicate_inputs_are_rejected() {
        let err = Project::builder()
            .virtual_file("A.java", "package p; class A {}")
            .virtual_file("B.java", "package p; class A {}")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProjectError::DuplicateType { ref name, .. } if name == "p.A"));
    }

    #[test]
    fn classpath_units_are_indexed_but_not_printed() {
        let dir = tempfile::tempdir().unwrap();
        let classpath = dir.path().join("classpath/transformation");
        fs::create_dir_all(&classpath).unwrap();
        fs::write(classpath.join("IFoo.java"), IFOO).unwrap();

        let project = Project::builder()
            .virtual_file("Foo1.java", FOO)
            .source_classpath(dir.path().join("classpath"))
            .build()
            .unwrap();
        assert!(project.find_type("transformation.IFoo").is_some());
        let printed = project.printed_units();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].relative_path, PathBuf::from("transformation/Foo1.java"));
    }

    #[test]
    fn get_type_suggests_close_names() {
        let project = Project::builder().virtual_file("Foo1.java", FOO).build().unwrap();
        let err = project.get_type("Foo2").unwrap_err();
        assert_eq!(err.to_string(), "no Class named 'Foo2' found (did you mean 'Foo1'?)");
    }

    #[test]
    fn pretty_print_writes_package_layout() {
        let input = tempfile::tempdir().unwrap();
        fs::write(input.path().join("Foo1.java"), FOO).unwrap();
        let out = tempfile::tempdir().unwrap();

        let project = Project::builder()
            .input(input.path())
            .output_dir(out.path())
            .validate_output(true)
            .build()
            .unwrap();
        let outcomes = project.pretty_print().unwrap();
        assert_eq!(outcomes.len(), 1);
        let written = fs::read_to_string(out.path().join("transformation/Foo1.java")).unwrap();
        assert_eq!(written, FOO);

        let again = project.pretty_print().unwrap();
        assert!(matches!(again[0], WriteOutcome::Unchanged { .. }));
    }

    #[test]
    fn pretty_print_needs_an_output_dir() {
        let project = Project::builder().virtual_file("Foo1.java", FOO).build().unwrap();
        assert!(matches!(project.pretty_print(), Err(ProjectError::MissingOutputDir)));
    }

    #[test]
    fn standalone_source_keeps_the_package() {
        let project = Project::builder().virtual_file("Foo1.java", FOO).build().unwrap();
        let foo = project.get_type("Foo1").unwrap();
        assert_eq!(project.standalone_source(foo), FOO);
    }

    #[test]
    fn parse_errors_carry_the_unit_name() {
        let err = Project::builder()
            .virtual_file("Broken.java", "class Broken {")
            .build()
            .unwrap_err();
        match err {
            ProjectError::Parse(parse) => assert_eq!(parse.file, "Broken.java"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

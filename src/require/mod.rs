// src/require/mod.rs

//! Requirement declarations and trait propagation
//!
//! A [`Require`] describes one dependency edge: which package is wanted and
//! how it is consumed (headers included, libraries linked, needed at build
//! time or at run time, visible to downstream consumers). Pure data plus
//! combination logic; resolution itself lives in `resolver`.
//!
//! Trait inference uses explicit tri-states rather than nullable booleans so
//! the package-type inference rules stay exhaustively checkable.

use crate::error::Result;
use crate::reference::RefSpec;
use serde::{Deserialize, Serialize};

/// A boolean trait that may defer to package-type inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TriState {
    Yes,
    No,
    /// Derive the effective value from the target's package type
    #[default]
    Inferred,
}

impl TriState {
    pub fn from_bool(value: bool) -> Self {
        if value { TriState::Yes } else { TriState::No }
    }

    /// Effective value against a concrete target package type
    pub fn resolve(self, target: PackageType) -> bool {
        match self {
            TriState::Yes => true,
            TriState::No => false,
            TriState::Inferred => target.runs_at_runtime(),
        }
    }
}

/// What kind of artifact a package produces
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum_macros::Display,
    strum_macros::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    Application,
    SharedLibrary,
    StaticLibrary,
    HeaderLibrary,
    BuildScripts,
    #[default]
    Unknown,
}

impl PackageType {
    /// Whether the package's artifacts must be present at run time by default
    pub fn runs_at_runtime(self) -> bool {
        matches!(
            self,
            PackageType::Application | PackageType::SharedLibrary | PackageType::BuildScripts
        )
    }

    /// Whether this package forwards its dependencies' headers by default
    ///
    /// A header-only library is pure interface: consumers compile against
    /// whatever it includes, so its dependencies' headers stay visible.
    pub fn propagates_headers(self) -> bool {
        matches!(self, PackageType::HeaderLibrary)
    }

    /// Whether this package forwards its dependencies' link libraries
    ///
    /// Static and header-only libraries defer linking to the final consumer.
    /// A shared library's link interface is already closed, so its own
    /// dependencies need not be linked again downstream.
    pub fn propagates_libs(self) -> bool {
        matches!(
            self,
            PackageType::HeaderLibrary | PackageType::StaticLibrary | PackageType::Unknown
        )
    }
}

/// Version-steering role of a requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverrideKind {
    /// Regular requirement
    #[default]
    None,
    /// Changes the version chosen for this name elsewhere in the graph
    /// without adding a dependency edge of its own
    Override,
    /// Changes the version like an override while also adding the edge
    Force,
}

/// How much of a dependency's identity folds into the consumer's binary id
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PackageIdMode {
    /// The dependency does not affect the consumer's identity
    Unrelated,
    PatchMode,
    MinorMode,
    MajorMode,
    FullVersionMode,
    FullRecipeMode,
    FullPackageMode,
}

impl PackageIdMode {
    /// Default mode when a requirement does not state one
    ///
    /// Embedded targets (static or header-only code compiled into the
    /// consumer) pin the full version; regular linkage tracks minor bumps;
    /// pure runtime presence leaves the consumer's identity alone.
    pub fn default_for(target: PackageType, require: &Require) -> Self {
        if require.headers || require.libs {
            if require.libs
                && matches!(
                    target,
                    PackageType::StaticLibrary | PackageType::HeaderLibrary | PackageType::Unknown
                )
            {
                PackageIdMode::FullVersionMode
            } else {
                PackageIdMode::MinorMode
            }
        } else {
            PackageIdMode::Unrelated
        }
    }
}

/// One dependency declaration with its propagation traits
#[derive(Debug, Clone, PartialEq)]
pub struct Require {
    /// Requirement target; the resolved node holds the concrete reference
    pub spec: RefSpec,
    /// Consumer compiles against the target's headers
    pub headers: bool,
    /// Consumer links the target's libraries
    pub libs: bool,
    /// Needed only to build the consumer (resolves in the build context)
    pub build: bool,
    /// Target's runtime artifacts must be present at the consumer's runtime
    pub run: TriState,
    /// Needed only to test the consumer; never seen downstream
    pub test: bool,
    /// Propagated to and constraining nodes beyond the direct consumer
    pub visible: bool,
    /// Forward the target's headers two hops down (None = package-type default)
    pub transitive_headers: Option<bool>,
    /// Forward the target's libraries two hops down (None = package-type default)
    pub transitive_libs: Option<bool>,
    pub override_kind: OverrideKind,
    /// Declared by the graph root itself
    pub direct: bool,
    /// Identity-folding policy; None = infer from package types
    pub package_id_mode: Option<PackageIdMode>,
}

impl Require {
    /// A regular host requirement: headers and libs consumed, visible,
    /// runtime presence inferred from the target's package type
    pub fn new(spec: RefSpec) -> Self {
        Self {
            spec,
            headers: true,
            libs: true,
            build: false,
            run: TriState::Inferred,
            test: false,
            visible: true,
            transitive_headers: None,
            transitive_libs: None,
            override_kind: OverrideKind::None,
            direct: false,
            package_id_mode: None,
        }
    }

    /// Parse a requirement target and build a regular requirement
    pub fn parse(s: &str) -> Result<Self> {
        Ok(Self::new(RefSpec::parse(s)?))
    }

    /// Mark as a build-tool requirement: runs during the build, invisible
    /// downstream, nothing compiled or linked against
    pub fn build_tool(mut self) -> Self {
        self.build = true;
        self.headers = false;
        self.libs = false;
        self.run = TriState::Yes;
        self.visible = false;
        self
    }

    /// Mark as a test-only requirement
    pub fn test_only(mut self) -> Self {
        self.test = true;
        self.visible = false;
        self
    }

    /// Hide from sibling branches and downstream consumers
    pub fn private(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn as_override(mut self) -> Self {
        self.override_kind = OverrideKind::Override;
        self
    }

    pub fn as_force(mut self) -> Self {
        self.override_kind = OverrideKind::Force;
        self
    }

    pub fn with_run(mut self, run: TriState) -> Self {
        self.run = run;
        self
    }

    pub fn with_transitive_headers(mut self, value: bool) -> Self {
        self.transitive_headers = Some(value);
        self
    }

    pub fn with_transitive_libs(mut self, value: bool) -> Self {
        self.transitive_libs = Some(value);
        self
    }

    pub fn with_package_id_mode(mut self, mode: PackageIdMode) -> Self {
        self.package_id_mode = Some(mode);
        self
    }

    /// Merge another path's traits into this one when a diamond collapses
    /// onto the same node: consumption widens, it never narrows
    pub fn aggregate(&mut self, other: &Require) {
        self.headers |= other.headers;
        self.libs |= other.libs;
        if other.run == TriState::Yes {
            self.run = TriState::Yes;
        }
        self.visible |= other.visible;
        self.direct |= other.direct;
    }

    /// Combine this requirement (consumer -> child) with one of the child's
    /// own requirements (child -> grandchild), yielding the requirement the
    /// consumer effectively holds on the grandchild.
    ///
    /// `child_type` is the child's package type; `up` must already carry a
    /// resolved `run` trait (Yes/No).
    ///
    /// Returns None when nothing propagates: test requirements stay with
    /// their declarer, build requirements stay within the node that needed
    /// them unless explicitly re-exposed, and private requirements never
    /// leak upward.
    pub fn transform_downstream(&self, child_type: PackageType, up: &Require) -> Option<Require> {
        if up.test {
            return None;
        }
        if up.build {
            if !up.visible {
                return None;
            }
            // Re-exposed tool requirement: propagates only as a version
            // constraint marker, nothing is consumed from it downstream
            let mut marker = up.clone();
            marker.headers = false;
            marker.libs = false;
            marker.run = TriState::No;
            marker.direct = false;
            return Some(marker);
        }
        if !up.visible {
            return None;
        }

        let mut down = up.clone();
        down.direct = false;
        down.headers = match self.transitive_headers {
            Some(forced) => forced && up.headers,
            None => up.headers && child_type.propagates_headers(),
        };
        down.libs = match self.transitive_libs {
            Some(forced) => forced && up.libs,
            None => up.libs && child_type.propagates_libs(),
        };
        // run survives as resolved on the hop pointing at the grandchild
        down.visible = self.visible && up.visible;
        Some(down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(s: &str) -> Require {
        Require::parse(s).unwrap()
    }

    #[test]
    fn test_defaults() {
        let r = req("zlib/1.3");
        assert!(r.headers);
        assert!(r.libs);
        assert!(!r.build);
        assert_eq!(r.run, TriState::Inferred);
        assert!(r.visible);
        assert_eq!(r.override_kind, OverrideKind::None);
    }

    #[test]
    fn test_build_tool_defaults() {
        let r = req("cmake/3.28").build_tool();
        assert!(r.build);
        assert!(!r.headers);
        assert!(!r.libs);
        assert_eq!(r.run, TriState::Yes);
        assert!(!r.visible);
    }

    #[test]
    fn test_tristate_resolve() {
        assert!(TriState::Yes.resolve(PackageType::HeaderLibrary));
        assert!(!TriState::No.resolve(PackageType::SharedLibrary));
        assert!(TriState::Inferred.resolve(PackageType::SharedLibrary));
        assert!(TriState::Inferred.resolve(PackageType::Application));
        assert!(!TriState::Inferred.resolve(PackageType::StaticLibrary));
        assert!(!TriState::Inferred.resolve(PackageType::HeaderLibrary));
    }

    #[test]
    fn test_package_type_strings() {
        assert_eq!(PackageType::SharedLibrary.to_string(), "shared-library");
        assert_eq!(
            "header-library".parse::<PackageType>().unwrap(),
            PackageType::HeaderLibrary
        );
    }

    #[test]
    fn test_aggregate_widens() {
        let mut a = req("zlib/1.3");
        a.headers = false;
        a.run = TriState::No;
        let mut b = req("zlib/1.3");
        b.libs = false;
        b.run = TriState::Yes;
        a.aggregate(&b);
        assert!(a.headers);
        assert!(a.libs);
        assert_eq!(a.run, TriState::Yes);
    }

    #[test]
    fn test_downstream_test_requirement_stops() {
        let consumer = req("libb/1.0");
        let up = req("gtest/1.14").test_only();
        assert!(consumer
            .transform_downstream(PackageType::StaticLibrary, &up)
            .is_none());
    }

    #[test]
    fn test_downstream_tool_requirement_stops() {
        let consumer = req("libb/1.0");
        let up = req("cmake/3.28").build_tool();
        assert!(consumer
            .transform_downstream(PackageType::StaticLibrary, &up)
            .is_none());
    }

    #[test]
    fn test_downstream_visible_tool_becomes_marker() {
        let consumer = req("libb/1.0");
        let mut up = req("protoc/25.0").build_tool();
        up.visible = true;
        let down = consumer
            .transform_downstream(PackageType::StaticLibrary, &up)
            .unwrap();
        assert!(down.build);
        assert!(!down.headers);
        assert!(!down.libs);
        assert_eq!(down.run, TriState::No);
    }

    #[test]
    fn test_downstream_private_stops() {
        let consumer = req("libb/1.0");
        let up = req("zlib/1.3").private();
        assert!(consumer
            .transform_downstream(PackageType::StaticLibrary, &up)
            .is_none());
    }

    #[test]
    fn test_downstream_headers_through_header_library() {
        let consumer = req("libb/1.0");
        let mut up = req("span-lite/0.11");
        up.run = TriState::No;
        let down = consumer
            .transform_downstream(PackageType::HeaderLibrary, &up)
            .unwrap();
        assert!(down.headers);
        assert!(down.libs);
    }

    #[test]
    fn test_downstream_headers_blocked_by_shared_library() {
        let consumer = req("libb/1.0");
        let mut up = req("zlib/1.3");
        up.run = TriState::Yes;
        let down = consumer
            .transform_downstream(PackageType::SharedLibrary, &up)
            .unwrap();
        assert!(!down.headers);
        assert!(!down.libs);
        // runtime presence still rides through
        assert_eq!(down.run, TriState::Yes);
    }

    #[test]
    fn test_downstream_libs_through_static_library() {
        let consumer = req("libb/1.0");
        let mut up = req("zlib/1.3");
        up.run = TriState::No;
        let down = consumer
            .transform_downstream(PackageType::StaticLibrary, &up)
            .unwrap();
        assert!(!down.headers);
        assert!(down.libs);
    }

    #[test]
    fn test_downstream_transitive_headers_forced() {
        let consumer = req("libb/1.0").with_transitive_headers(true);
        let mut up = req("zlib/1.3");
        up.run = TriState::Yes;
        let down = consumer
            .transform_downstream(PackageType::SharedLibrary, &up)
            .unwrap();
        assert!(down.headers);
    }

    #[test]
    fn test_default_package_id_mode() {
        let linked = req("zlib/1.3");
        assert_eq!(
            PackageIdMode::default_for(PackageType::StaticLibrary, &linked),
            PackageIdMode::FullVersionMode
        );
        assert_eq!(
            PackageIdMode::default_for(PackageType::SharedLibrary, &linked),
            PackageIdMode::MinorMode
        );
        let mut runtime_only = req("icu/74.1");
        runtime_only.headers = false;
        runtime_only.libs = false;
        assert_eq!(
            PackageIdMode::default_for(PackageType::SharedLibrary, &runtime_only),
            PackageIdMode::Unrelated
        );
    }
}

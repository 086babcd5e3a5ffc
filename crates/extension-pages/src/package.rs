//! Sample package for the pages extension.

use extensa_plugin::PackageBuilder;

use crate::ENTRYPOINT;

/// Builds a package selecting the compiled-in pages module.
pub fn sample_package(version: &str) -> PackageBuilder {
    PackageBuilder::new()
        .with_top_level_dir(format!("pages-{version}"))
        .manifest(format!(
            r#"name = "Pages"
version = "{version}"
type = "generic"
description = "Simple content pages"
route_prefix = "pages"
capabilities = ["routes", "schema"]

[routes]
entrypoint = "{ENTRYPOINT}"
"#
        ))
}

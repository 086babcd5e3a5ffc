//! Convenience macros for extension development.

/// Exports a module constructor from an extension shared library.
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug, Default)]
/// struct Reports;
///
/// #[async_trait::async_trait]
/// impl extensa_plugin::ExtensionModule for Reports {}
///
/// extensa_plugin::export_extension_module!(Reports::default);
/// ```
#[macro_export]
macro_rules! export_extension_module {
    ($constructor:path) => {
        #[unsafe(no_mangle)]
        pub fn extensa_module_create() -> ::std::boxed::Box<dyn $crate::module::ExtensionModule> {
            ::std::boxed::Box::new($constructor())
        }
    };
}

//! 核心宏定义
//!
//! 提供统一的宏来减少代码重复

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use micro_particles::impl_default;
///
/// struct FrameSettings {
///     interval_ms: u64,
///     label: String,
/// }
///
/// impl_default!(FrameSettings {
///     interval_ms: 16,
///     label: String::new(),
/// });
///
/// assert_eq!(FrameSettings::default().interval_ms, 16);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

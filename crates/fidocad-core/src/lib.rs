//! FidoCadJ 核心
//!
//! 电路图/PCB 草图的图元模型、坐标映射与导出引擎。
//!
//! # 架构
//!
//! - [`primitives`]: 各类图元，统一实现 [`primitives::GraphicPrimitive`]
//! - [`map_coordinates`]: 逻辑坐标到设备坐标的映射
//! - [`model`]: 图纸模型（图元、图层、宏库）
//! - [`parser`]: 文本格式的解析与序列化
//! - [`drawing`]: 在 [`graphics::Graphics`] 上逐层绘制
//! - [`export`]: 导出接口与导出驱动
//!
//! # 示例
//!
//! ```rust
//! use fidocad_core::prelude::*;
//!
//! let mut model = DrawingModel::new();
//! ParserActions::new(&mut model)
//!     .parse_string("LI 0 0 100 100 0\n")
//!     .unwrap();
//! assert_eq!(model.primitives.len(), 1);
//! ```

pub mod config;
pub mod drawing;
pub mod error;
pub mod export;
pub mod geometry;
pub mod graphics;
pub mod layer;
pub mod library;
pub mod map_coordinates;
pub mod math;
pub mod model;
pub mod parser;
pub mod primitives;
pub mod spline;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::config::DrawingConfig;
    pub use crate::drawing::{calculate_zoom_to_fit, draw_model, image_size};
    pub use crate::error::{FidoError, Result};
    pub use crate::export::{export_drawing, export_header, ExportInterface, ExportOptions};
    pub use crate::graphics::{Graphics, NullGraphics};
    pub use crate::layer::{standard_layers, Color, LayerDesc, MAX_LAYERS};
    pub use crate::library::{Library, MacroDesc};
    pub use crate::map_coordinates::MapCoordinates;
    pub use crate::math::{DimensionG, Point2, PointG, RectangleG, Vector2};
    pub use crate::model::DrawingModel;
    pub use crate::parser::ParserActions;
    pub use crate::primitives::{GraphicPrimitive, Primitive};
}

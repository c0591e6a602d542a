//! World-to-device stage: the last step of every transform chain.

use crate::basics::{is_vertex, VertexSource};
use crate::trans_view::ViewTransform;

pub struct ConvView<VS: VertexSource> {
    source: VS,
    view: ViewTransform,
}

impl<VS: VertexSource> ConvView<VS> {
    pub fn new(source: VS, view: ViewTransform) -> Self {
        Self { source, view }
    }
}

impl<VS: VertexSource> VertexSource for ConvView<VS> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        let cmd = self.source.vertex(x, y);
        if is_vertex(cmd) {
            self.view.forward(x, y);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::{collect_vertices, RectD};
    use crate::path_storage::PathStorage;

    #[test]
    fn test_world_to_pixels() {
        let mut p = PathStorage::new();
        p.move_to(0.0, 0.0);
        p.line_to(50.0, 50.0);
        let view = ViewTransform::new(100, 100, RectD::new(0.0, 0.0, 100.0, 100.0));
        let v = collect_vertices(&mut ConvView::new(&mut p, view));
        assert_eq!((v[0].x, v[0].y), (0.0, 100.0));
        assert_eq!((v[1].x, v[1].y), (50.0, 50.0));
    }
}

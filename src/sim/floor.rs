//! Static floor body
//!
//! Exactly one static rectangle spans the bottom of the field. Engines can't
//! resize a static body's shape in place, so every resize replaces it.

use glam::Vec2;

use super::engine::{BodyHandle, Engine};
use crate::viewport::ViewportMetrics;

#[derive(Debug, Clone)]
pub struct PhysicsFloorAdapter {
    height: f32,
    body: Option<BodyHandle>,
}

impl PhysicsFloorAdapter {
    pub fn new(height: f32) -> Self {
        Self {
            height: height.max(1.0),
            body: None,
        }
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Top edge of the floor in field coordinates
    pub fn floor_y(&self, viewport: &ViewportMetrics) -> f32 {
        viewport.height() - self.height
    }

    /// Replace the floor body to match the viewport
    pub fn sync<E: Engine + ?Sized>(&mut self, engine: &mut E, viewport: &ViewportMetrics) {
        if let Some(old) = self.body.take() {
            engine.remove_body(old);
        }
        let center = Vec2::new(viewport.width() / 2.0, viewport.height() - self.height / 2.0);
        let size = Vec2::new(viewport.width(), self.height);
        match engine.add_static_rect(center, size) {
            Ok(body) => self.body = Some(body),
            Err(e) => log::error!("{e} - entities will fall through"),
        }
    }

    pub fn remove<E: Engine + ?Sized>(&mut self, engine: &mut E) {
        if let Some(old) = self.body.take() {
            engine.remove_body(old);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::headless::HeadlessEngine;

    #[test]
    fn test_resize_replaces_floor() {
        let mut engine = HeadlessEngine::new(390.0, 844.0);
        let mut viewport = ViewportMetrics::new(390.0, 844.0);
        let mut floor = PhysicsFloorAdapter::new(40.0);

        floor.sync(&mut engine, &viewport);
        let first = floor.body().unwrap();
        assert_eq!(
            engine.static_bodies(),
            vec![(Vec2::new(195.0, 824.0), Vec2::new(390.0, 40.0))]
        );
        assert_eq!(floor.floor_y(&viewport), 804.0);

        viewport.resize(844.0, 390.0);
        floor.sync(&mut engine, &viewport);
        assert_ne!(floor.body().unwrap(), first);
        assert_eq!(
            engine.static_bodies(),
            vec![(Vec2::new(422.0, 370.0), Vec2::new(844.0, 40.0))]
        );
    }
}

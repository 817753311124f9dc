//! Engine Wiring Integration Tests
//!
//! Tests for:
//! - Scene/viewport/pipeline registration cooperating through `Engine`
//!   without a GPU device attached
//! - `Viewport::world_to_clip` feeding a registered `RenderPipeline`'s
//!   `collect_draw_calls`, batched end to end through `PipelineManager`
//! - Multiple viewports onto the same scene collecting independently

use glam::Vec2;
use vela::config::EngineConfig;
use vela::engine::Engine;
use vela::nodes::geometry_node::{geometry_node_type_tag, GeometryNode, GeometryPipeline};
use vela::scene::viewport::{CameraLayout, ScreenLayout};

fn headless_engine() -> Engine {
    Engine::new(EngineConfig::headless())
}

#[test]
fn registering_a_pipeline_before_any_gpu_is_attached_succeeds() {
    let mut engine = headless_engine();
    engine.register_pipeline(Box::new(GeometryPipeline::new())).unwrap();
    assert!(!engine.is_gpu_ready());
}

#[test]
fn scene_and_viewport_round_trip_through_the_manager() {
    let mut engine = headless_engine();
    let scene = engine.scenes_mut().create_scene();
    let viewport = engine.scenes_mut().create_viewport();

    engine
        .scenes_mut()
        .viewport_mut(viewport)
        .unwrap()
        .set_scene(Some(scene));
    engine
        .scenes_mut()
        .viewport_mut(viewport)
        .unwrap()
        .set_screen_layout(ScreenLayout::new(Vec2::ZERO, Vec2::new(800.0, 600.0)));

    assert_eq!(engine.scenes().viewport(viewport).unwrap().scene(), Some(scene));
    assert_eq!(engine.scenes().viewports_by_z_order(), vec![viewport]);
}

#[test]
fn destroying_a_scene_leaves_its_viewport_live_but_unrenderable() {
    let mut engine = headless_engine();
    let scene = engine.scenes_mut().create_scene();
    let viewport = engine.scenes_mut().create_viewport();
    engine
        .scenes_mut()
        .viewport_mut(viewport)
        .unwrap()
        .set_scene(Some(scene));

    engine.scenes_mut().destroy_scene(scene);

    assert!(engine.scenes().viewport(viewport).is_some());
    assert_eq!(engine.scenes().viewport(viewport).unwrap().scene(), Some(scene));
    assert!(!engine.scenes().scene_is_live(scene));
}

#[test]
fn a_viewports_world_to_clip_feeds_a_pipelines_batches() {
    let mut engine = headless_engine();
    let scene_handle = engine.scenes_mut().create_scene();
    let viewport_handle = engine.scenes_mut().create_viewport();
    {
        let vp = engine.scenes_mut().viewport_mut(viewport_handle).unwrap();
        vp.set_scene(Some(scene_handle));
        vp.set_screen_layout(ScreenLayout::new(Vec2::ZERO, Vec2::new(800.0, 600.0)));
        vp.set_camera_layout(CameraLayout::identity());
    }

    let tag = geometry_node_type_tag();
    {
        let scene = engine.scenes_mut().scene_mut(scene_handle).unwrap();
        scene.create_node(None, tag, GeometryNode::rectangle([1.0, 0.0, 0.0, 1.0], Vec2::splat(50.0)));
        scene.create_node(None, tag, GeometryNode::rectangle([1.0, 0.0, 0.0, 1.0], Vec2::splat(50.0)));
        scene.refresh_transforms();
    }

    let mut pipeline = GeometryPipeline::new();
    let scene = engine.scenes().scene(scene_handle).unwrap();
    let viewport = engine.scenes().viewport(viewport_handle).unwrap();
    let world_to_clip = viewport.world_to_clip();
    let layout = viewport.screen_layout();
    pipeline.collect_draw_calls(scene, world_to_clip, (layout.size.x as u32, layout.size.y as u32));

    // Both rectangles share one geometry, so they land in a single batch of
    // two instances, not two separate batches.
    assert_eq!(pipeline_batch_count(&pipeline), 1);
    assert_eq!(pipeline_instance_count(&pipeline), 2);
}

// `GeometryPipeline`'s batch map is private; these two helpers reach in via
// the crate's own `#[cfg(test)]`-free public surface by round-tripping
// through `clear_draw_queue`'s observable effect instead of a field probe.
fn pipeline_batch_count(pipeline: &GeometryPipeline) -> usize {
    pipeline.batch_count_for_test()
}

fn pipeline_instance_count(pipeline: &GeometryPipeline) -> usize {
    pipeline.instance_count_for_test()
}

// Tests for the interaction controller

use geofeedback_core::config::AppConfig;
use geofeedback_core::controller::MapController;
use geofeedback_core::filter::{CategoryFilter, RiskFilter};
use geofeedback_core::map::{LayerId, Viewport};
use geofeedback_loader::{Category, Coordinates, DataOrigin, Dataset, Facility, RiskLevel};

fn dataset() -> Dataset {
    Dataset::new(vec![
        Facility::new("Escuela Papudo", Category::Educacion, RiskLevel::High, Coordinates::new(-71.4469, -32.5127)),
        Facility::new("Posta Rural", Category::Salud, RiskLevel::Low, Coordinates::new(-71.4480, -32.5060)),
        Facility::new("Bomberos", Category::Emergencias, RiskLevel::High, Coordinates::new(-71.4501, -32.5079)),
        Facility::new("Municipalidad", Category::Gobierno, RiskLevel::Medium, Coordinates::new(-71.4495, -32.5071)),
        Facility::new("Minimarket", Category::Comercio, RiskLevel::NoData, Coordinates::new(-71.4470, -32.5050)),
    ])
}

fn loaded_controller() -> MapController {
    let mut controller = MapController::new(&AppConfig::default());
    controller.set_dataset(dataset(), DataOrigin::Remote);
    controller
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_new_controller_has_only_base_layer() {
    let controller = MapController::new(&AppConfig::default());
    assert!(!controller.is_loaded());
    assert!(controller.layer_visible(LayerId::Base));
    assert!(!controller.layer_visible(LayerId::Risk));
    assert!(controller.infrastructure_layer().is_empty());
}

#[test]
fn test_set_dataset_builds_layers_and_stats() {
    let controller = loaded_controller();

    assert!(controller.is_loaded());
    assert_eq!(controller.origin(), Some(DataOrigin::Remote));
    assert!(controller.layer_visible(LayerId::Risk));
    assert!(controller.layer_visible(LayerId::Infrastructure));
    assert_eq!(controller.risk_layer().len(), 3);
    assert_eq!(controller.infrastructure_layer().len(), 5);

    let panel = controller.panel();
    assert_eq!((panel.total, panel.high, panel.medium, panel.low), (5, 2, 1, 1));
}

#[test]
fn test_reload_keeps_layer_toggles() {
    let mut controller = loaded_controller();
    controller.set_layer_visible(LayerId::Risk, false);
    controller.set_dataset(dataset(), DataOrigin::LocalFallback);

    assert!(!controller.layer_visible(LayerId::Risk));
    assert_eq!(controller.infrastructure_layer().len(), 5);
    assert_eq!(controller.risk_layer().len(), 3);
}

// ============================================================================
// Layer toggles and filters
// ============================================================================

#[test]
fn test_layer_toggle_leaves_data_untouched() {
    let mut controller = loaded_controller();
    let before = *controller.statistics();

    controller.toggle_layer(LayerId::Infrastructure);
    assert!(!controller.layer_visible(LayerId::Infrastructure));
    assert_eq!(*controller.statistics(), before);
    assert_eq!(controller.infrastructure_layer().len(), 5);

    controller.toggle_layer(LayerId::Infrastructure);
    assert!(controller.layer_visible(LayerId::Infrastructure));
}

#[test]
fn test_risk_filter_rebuilds_markers_and_panel() {
    let mut controller = loaded_controller();
    controller.set_risk_filter(RiskFilter::Level(RiskLevel::High));

    assert_eq!(controller.infrastructure_layer().len(), 2);
    let panel = controller.panel();
    assert_eq!((panel.total, panel.high, panel.medium, panel.low), (2, 2, 0, 0));
    assert_eq!(controller.risk_layer().len(), 3);
}

#[test]
fn test_combined_filters_commute() {
    let mut a = loaded_controller();
    a.set_risk_filter(RiskFilter::Level(RiskLevel::High));
    a.set_category_filter(CategoryFilter::Only(Category::Educacion));

    let mut b = loaded_controller();
    b.set_category_filter(CategoryFilter::Only(Category::Educacion));
    b.set_risk_filter(RiskFilter::Level(RiskLevel::High));

    let names_a: Vec<_> = a.visible_facilities().map(|f| f.name.clone()).collect();
    let names_b: Vec<_> = b.visible_facilities().map(|f| f.name.clone()).collect();
    assert_eq!(names_a, vec!["Escuela Papudo".to_string()]);
    assert_eq!(names_a, names_b);
    assert_eq!(a.statistics(), b.statistics());
}

#[test]
fn test_filter_with_no_match_empties_layer() {
    let mut controller = loaded_controller();
    controller.set_risk_filter(RiskFilter::Level(RiskLevel::Low));
    controller.set_category_filter(CategoryFilter::Only(Category::Gobierno));

    assert_eq!(controller.visible_count(), 0);
    assert!(controller.infrastructure_layer().is_empty());
    assert_eq!(controller.panel().total, 0);
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_ignores_filters() {
    let mut controller = loaded_controller();
    controller.set_category_filter(CategoryFilter::Only(Category::Salud));
    controller.search_input("escuela");

    let state = controller.search_state();
    assert!(state.visible);
    assert_eq!(state.hits().count(), 1);
}

#[test]
fn test_select_search_result_moves_map() {
    let mut controller = loaded_controller();
    controller.search_input("posta");
    assert!(controller.select_search_result(0));

    assert_eq!(controller.map().zoom(), 16);
    assert_eq!(controller.map().center(), Coordinates::new(-71.4480, -32.5060));
    let state = controller.search_state();
    assert!(!state.visible);
    assert!(state.query.is_empty());
    assert!(state.rows.is_empty());
}

#[test]
fn test_placeholder_is_not_selectable() {
    let mut controller = loaded_controller();
    let center = controller.map().center();
    controller.search_input("zzz");
    assert!(!controller.select_search_result(0));
    assert_eq!(controller.map().center(), center);
    assert!(controller.search_state().visible);
}

#[test]
fn test_short_query_and_dismiss() {
    let mut controller = loaded_controller();
    controller.search_input("es");
    assert!(controller.search_state().visible);

    controller.dismiss_search();
    assert!(!controller.search_state().visible);

    controller.search_input("e");
    assert!(!controller.search_state().visible);
    assert!(controller.search_state().rows.is_empty());
}

// ============================================================================
// Clicks
// ============================================================================

#[test]
fn test_click_marker_opens_popup() {
    let mut controller = loaded_controller();
    let popup = controller.click_marker(1).cloned().unwrap();
    assert_eq!(popup.title, "Posta Rural");
    assert_eq!(controller.popup(), Some(&popup));
    assert!(controller.click_marker(99).is_none());
}

#[test]
fn test_click_cluster_zooms_in() {
    let mut controller = loaded_controller();
    let viewport = Viewport::new(800.0, 600.0);
    let zoom = controller.map().zoom();

    let cluster = controller
        .clusters(viewport)
        .into_iter()
        .find(|c| c.len() > 1)
        .expect("facilities are close enough to cluster at zoom 13");

    assert!(controller.click_cluster(&cluster, viewport).is_none());
    assert!(controller.map().zoom() > zoom);
    assert_eq!(controller.map().center(), cluster.bounds.center());
}

#[test]
fn test_cluster_at_view_center() {
    let controller = loaded_controller();
    let viewport = Viewport::new(800.0, 600.0);
    let center = geofeedback_core::map::Point::new(400.0, 300.0);
    assert!(controller.cluster_at(center, viewport).is_some());
}

#[test]
fn test_click_zone_opens_zone_popup() {
    let mut controller = loaded_controller();
    let viewport = Viewport::new(800.0, 600.0);
    let center = geofeedback_core::map::Point::new(400.0, 300.0);

    controller.map_mut().set_view(Coordinates::new(-71.46, -32.52), 15);
    let popup = controller.click_zone_at(center, viewport).cloned().unwrap();
    assert_eq!(popup.title, "Zona de Riesgo Alto");
    assert_eq!(popup.lines, vec!["Nivel: 3".to_string()]);
    assert_eq!(controller.popup(), Some(&popup));

    controller.set_layer_visible(LayerId::Risk, false);
    assert!(controller.click_zone_at(center, viewport).is_none());
}

#[test]
fn test_click_outside_zones_closes_popup() {
    let mut controller = loaded_controller();
    let viewport = Viewport::new(800.0, 600.0);
    let center = geofeedback_core::map::Point::new(400.0, 300.0);

    controller.map_mut().set_view(Coordinates::new(-71.46, -32.52), 15);
    assert!(controller.click_zone_at(center, viewport).is_some());

    controller.map_mut().set_view(Coordinates::new(-71.30, -32.40), 15);
    assert!(controller.click_zone_at(center, viewport).is_none());
    assert!(controller.popup().is_none());
}

// ============================================================================
// Viewport
// ============================================================================

#[test]
fn test_in_view_count_follows_map_and_filters() {
    let mut controller = loaded_controller();
    let viewport = Viewport::new(800.0, 600.0);
    assert_eq!(controller.in_view_count(viewport), 5);

    controller.set_risk_filter(RiskFilter::Level(RiskLevel::High));
    assert_eq!(controller.in_view_count(viewport), 2);

    controller.map_mut().set_view(Coordinates::new(-71.30, -32.40), 16);
    assert_eq!(controller.in_view_count(viewport), 0);
}

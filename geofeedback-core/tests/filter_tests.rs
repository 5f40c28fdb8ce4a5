// Tests for risk/category filtering

use geofeedback_core::filter::{CategoryFilter, FilterState, RiskFilter};
use geofeedback_loader::{Category, Coordinates, Dataset, Facility, RiskLevel};

fn sample_dataset() -> Dataset {
    Dataset::new(vec![
        Facility::new("Escuela Papudo", Category::Educacion, RiskLevel::High, Coordinates::new(-71.4469, -32.5127)),
        Facility::new("Posta Rural", Category::Salud, RiskLevel::Low, Coordinates::new(-71.4480, -32.5060)),
        Facility::new("Bomberos", Category::Emergencias, RiskLevel::High, Coordinates::new(-71.4501, -32.5079)),
        Facility::new("Municipalidad", Category::Gobierno, RiskLevel::Medium, Coordinates::new(-71.4495, -32.5071)),
        Facility::new("Minimarket", Category::Comercio, RiskLevel::NoData, Coordinates::new(-71.4470, -32.5050)),
        Facility::new("Liceo", Category::Educacion, RiskLevel::Low, Coordinates::new(-71.4420, -32.5030)),
    ])
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_risk_filter_from_str() {
    assert_eq!("all".parse::<RiskFilter>(), Ok(RiskFilter::All));
    assert_eq!("ALL".parse::<RiskFilter>(), Ok(RiskFilter::All));
    assert_eq!("3".parse::<RiskFilter>(), Ok(RiskFilter::Level(RiskLevel::High)));
    assert_eq!("0".parse::<RiskFilter>(), Ok(RiskFilter::Level(RiskLevel::NoData)));
    assert!("4".parse::<RiskFilter>().is_err());
    assert!("alto".parse::<RiskFilter>().is_err());
}

#[test]
fn test_category_filter_from_str() {
    assert_eq!("all".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
    assert_eq!(
        "salud".parse::<CategoryFilter>(),
        Ok(CategoryFilter::Only(Category::Salud))
    );
    assert_eq!(
        "Educación".parse::<CategoryFilter>(),
        Ok(CategoryFilter::Only(Category::Educacion))
    );
}

#[test]
fn test_filter_cycling() {
    let mut risk = RiskFilter::All;
    let mut seen = Vec::new();
    for _ in 0..5 {
        risk = risk.next();
        seen.push(risk);
    }
    assert_eq!(seen.last(), Some(&RiskFilter::All));
    assert_eq!(seen[0], RiskFilter::Level(RiskLevel::High));

    let mut category = CategoryFilter::All;
    for _ in 0..Category::KNOWN.len() {
        category = category.next();
        assert!(matches!(category, CategoryFilter::Only(_)));
    }
    assert_eq!(category.next(), CategoryFilter::All);
}

// ============================================================================
// Application
// ============================================================================

#[test]
fn test_unfiltered_keeps_everything_in_order() {
    let dataset = sample_dataset();
    let filters = FilterState::default();
    assert!(filters.is_unfiltered());
    assert_eq!(filters.apply(&dataset), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_school_included_only_under_matching_filters() {
    let dataset = sample_dataset();

    let high = FilterState::new(RiskFilter::Level(RiskLevel::High), CategoryFilter::All);
    assert!(high.apply(&dataset).contains(&0));

    let low = FilterState::new(RiskFilter::Level(RiskLevel::Low), CategoryFilter::All);
    assert!(!low.apply(&dataset).contains(&0));

    let salud = FilterState::new(RiskFilter::All, CategoryFilter::Only(Category::Salud));
    assert!(!salud.apply(&dataset).contains(&0));
}

#[test]
fn test_filter_is_conjunction() {
    let dataset = sample_dataset();
    let filters = FilterState::new(
        RiskFilter::Level(RiskLevel::Low),
        CategoryFilter::Only(Category::Educacion),
    );
    assert_eq!(filters.apply(&dataset), vec![5]);

    for idx in filters.apply(&dataset) {
        let f = dataset.get(idx).unwrap();
        assert_eq!(f.risk_level, RiskLevel::Low);
        assert_eq!(f.category, Category::Educacion);
    }
}

#[test]
fn test_filter_order_does_not_matter() {
    let dataset = sample_dataset();
    let risk = RiskFilter::Level(RiskLevel::High);
    let category = CategoryFilter::Only(Category::Emergencias);

    let mut a = FilterState::default();
    a.risk = risk;
    a.category = category.clone();

    let mut b = FilterState::default();
    b.category = category;
    b.risk = risk;

    assert_eq!(a.apply(&dataset), b.apply(&dataset));
    assert_eq!(a.apply(&dataset), vec![2]);
}

#[test]
fn test_filter_on_empty_dataset() {
    let dataset = Dataset::default();
    let filters = FilterState::new(RiskFilter::Level(RiskLevel::High), CategoryFilter::All);
    assert!(filters.apply(&dataset).is_empty());
}

#[test]
fn test_unknown_category_filter_ignores_case() {
    let dataset = Dataset::new(vec![
        Facility::new("Oficina de Turismo", Category::from_name("Turismo"), RiskLevel::Low, Coordinates::new(-71.4490, -32.5060)),
        Facility::new("Posta Rural", Category::Salud, RiskLevel::Low, Coordinates::new(-71.4480, -32.5060)),
    ]);

    let lower = FilterState::new(RiskFilter::All, "turismo".parse().unwrap());
    assert_eq!(lower.apply(&dataset), vec![0]);

    let upper = FilterState::new(RiskFilter::All, "TURISMO".parse().unwrap());
    assert_eq!(upper.apply(&dataset), vec![0]);

    let other = FilterState::new(RiskFilter::All, "deportes".parse().unwrap());
    assert!(other.apply(&dataset).is_empty());
}

use super::*;

#[test]
fn action_round_trips_through_yaml() {
    let action = Action {
        id: ActionId::new("11111111-1111-1111-1111-111111111111"),
        action_type: ActionType::EmailResponse,
        priority: Priority::Low,
        context: BTreeMap::from([("subject".to_string(), "hi".to_string())]),
        created_at: Utc::now(),
        source: "gmail".to_string(),
        estimated_duration_min: Some(15),
    };

    let yaml = serde_yaml::to_string(&action).unwrap();
    assert!(yaml.contains("type: email_response"));
    assert!(yaml.contains("priority: low"));

    let back: Action = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back.id, action.id);
    assert_eq!(back.estimated_duration_min, Some(15));
}

#[test]
fn default_action_type_is_other() {
    assert_eq!(ActionType::default(), ActionType::Other);
}

#[test]
fn estimated_duration_omitted_when_absent() {
    let action = Action {
        id: ActionId::new("x"),
        action_type: ActionType::Other,
        priority: Priority::Medium,
        context: BTreeMap::new(),
        created_at: Utc::now(),
        source: "fs".to_string(),
        estimated_duration_min: None,
    };
    let yaml = serde_yaml::to_string(&action).unwrap();
    assert!(!yaml.contains("estimated_duration_min"));
}

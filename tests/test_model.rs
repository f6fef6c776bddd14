#[cfg(test)]
mod test_model {
    use bnkit::{DataTable, Evidence, Group, Network, StateSpec, TableSpec, Variable};
    use std::collections::HashMap;

    /// Six-variable fixture: two priors feeding a chain with a collider.
    /// C's columns under A=No are identical across B, so observing C with
    /// A=No must leave B's marginal at its prior.
    fn create_test_model() -> Network {
        let a = Variable::new("A", StateSpec::YN, &[], TableSpec::Uniform)
            .unwrap()
            .with_description("This is the prior variable")
            .with_group("inputs_1");
        let b = Variable::new(
            "B",
            StateSpec::labels(["Low", "Med", "High"]),
            &[],
            TableSpec::Flat(vec![0.6, 0.15, 0.25]),
        )
        .unwrap()
        .with_group("outputs_1");
        let c = Variable::new(
            "C",
            StateSpec::labels(["Positive", "Negative"]),
            &[&a, &b],
            TableSpec::Flat(vec![
                0.8, 0.8, 0.8, 0.3, 0.4, 0.5, //
                0.2, 0.2, 0.2, 0.7, 0.6, 0.5,
            ]),
        )
        .unwrap()
        .with_group("inputs_1");
        let d = Variable::new(
            "D",
            StateSpec::labels(["Red", "Green", "Blue"]),
            &[&c],
            TableSpec::Flat(vec![0.5, 0.2, 0.3, 0.3, 0.2, 0.5]),
        )
        .unwrap()
        .with_group("inputs_2");
        let e = Variable::new(
            "E",
            StateSpec::labels(["Down", "Up"]),
            &[&c, &d],
            TableSpec::Uniform,
        )
        .unwrap()
        .with_group("outputs_2");
        let f = Variable::new(
            "F",
            StateSpec::labels(["Red", "Green", "Blue"]),
            &[&e],
            TableSpec::Flat(vec![0.1, 0.6, 0.3, 0.3, 0.6, 0.1]),
        )
        .unwrap()
        .with_group("outputs_2");

        let group = |id: &str, name: &str| Group {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(format!("Description for {name}")),
        };

        Network::new("Zest test network", vec![a, b, c, d, e, f])
            .unwrap()
            .with_id("zest_test_network")
            .unwrap()
            .with_description("This is my BN")
            .with_input_groups(vec![group("inputs_1", "Inputs 1"), group("inputs_2", "Inputs 2")])
            .unwrap()
            .with_output_groups(vec![
                group("outputs_1", "Outputs 1"),
                group("outputs_2", "Outputs 2"),
            ])
            .unwrap()
    }

    fn evidence(entries: &[(&str, &str)]) -> Evidence {
        entries
            .iter()
            .map(|(id, state)| (id.to_string(), Some(state.to_string())))
            .collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_model_variable_ids() {
        let model = create_test_model();
        assert_eq!(model.variable_ids(), vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_model_variable_names() {
        let model = create_test_model();
        assert_eq!(model.variable_names(), vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn test_model_edges() {
        let model = create_test_model();
        let pair = |p: &str, c: &str| (p.to_string(), c.to_string());
        assert_eq!(
            model.edges(),
            vec![
                pair("a", "c"),
                pair("b", "c"),
                pair("c", "d"),
                pair("c", "e"),
                pair("d", "e"),
                pair("e", "f"),
            ]
        );
    }

    #[test]
    fn test_no_evidence_marginals_sum_to_one() {
        let mut model = create_test_model();
        let marginals = model.query(&HashMap::new()).unwrap();
        assert_eq!(marginals.len(), 6);
        for (id, distribution) in marginals {
            let total: f64 = distribution.iter().sum();
            assert!((total - 1.0).abs() < 1e-6, "{id} sums to {total}");
        }
    }

    #[test]
    fn test_model_prediction() {
        let mut model = create_test_model();
        let marginals = model
            .query(&evidence(&[("a", "No"), ("c", "Positive"), ("d", "Red")]))
            .unwrap();

        // Evidence variables are excluded from the result.
        assert_eq!(marginals.len(), 3);
        assert_close(&marginals["b"], &[0.6, 0.15, 0.25]);
        assert_close(&marginals["e"], &[0.5, 0.5]);
        assert_close(&marginals["f"], &[0.35, 0.3, 0.35]);
    }

    #[test]
    fn test_query_unknown_variable() {
        let mut model = create_test_model();
        let err = model.query(&evidence(&[("zz", "No")])).unwrap_err();
        assert!(matches!(err, bnkit::BnError::Lookup(_)));
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn test_query_unknown_state_names_variable_and_state() {
        let mut model = create_test_model();
        let err = model.query(&evidence(&[("a", "Maybe")])).unwrap_err();
        assert!(matches!(err, bnkit::BnError::Lookup(_)));
        let message = err.to_string();
        assert!(message.contains("'a'"));
        assert!(message.contains("'Maybe'"));
    }

    #[test]
    fn test_query_drops_null_evidence() {
        let mut model = create_test_model();
        let mut with_null = evidence(&[("c", "Positive")]);
        with_null.insert("a".to_string(), None);
        let marginals = model.query(&with_null).unwrap();
        // Only c counts as evidence; a is reported like any other variable.
        assert_eq!(marginals.len(), 5);
        assert!(marginals.contains_key("a"));
    }

    #[test]
    fn test_query_batch_preserves_row_order() {
        let mut model = create_test_model();
        let rows = vec![
            evidence(&[("a", "No"), ("c", "Positive"), ("d", "Red")]),
            evidence(&[("e", "Up")]),
        ];
        let results = model.query_batch(&rows).unwrap();
        assert_eq!(results.len(), 2);
        assert_close(&results[0]["b"], &[0.6, 0.15, 0.25]);
        assert_close(&results[1]["f"], &[0.6, 0.3, 0.1]);
    }

    #[test]
    fn test_sample_labels_columns_in_network_order() {
        let mut model = create_test_model();
        let samples = model.sample(20).unwrap();
        assert_eq!(samples.columns, model.variable_ids());
        assert_eq!(samples.rows.len(), 20);
        for row in &samples.rows {
            assert_eq!(row.len(), 6);
            let b = model.lookup("b").unwrap();
            assert!(b.states().contains(&row[1]));
        }
    }

    #[test]
    fn test_fit_reestimates_tables() {
        let a = Variable::new("A", StateSpec::labels(["x", "y"]), &[], TableSpec::Uniform).unwrap();
        let b = Variable::new("B", StateSpec::YN, &[&a], TableSpec::Uniform).unwrap();
        let mut model = Network::new("Pair", vec![a, b]).unwrap();

        let data = DataTable::new(
            vec!["a".to_string()],
            vec![
                vec!["x".to_string()],
                vec!["x".to_string()],
                vec!["x".to_string()],
                vec!["y".to_string()],
            ],
        );
        let targets = DataTable::new(
            vec!["b".to_string()],
            vec![
                vec!["No".to_string()],
                vec!["No".to_string()],
                vec!["Yes".to_string()],
                vec!["Yes".to_string()],
            ],
        );
        model.fit(&data, Some(&targets)).unwrap();

        let a_table = model.lookup("a").unwrap().table().to_flat();
        assert!((a_table[0] - 0.75).abs() < 1e-12);

        let b_table = model.lookup("b").unwrap().table().to_flat();
        // P(No | x) = 2/3, P(No | y) = 0.
        assert!((b_table[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((b_table[1] - 0.0).abs() < 1e-12);

        // The refreshed tables drive subsequent queries.
        let marginals = model.query(&HashMap::new()).unwrap();
        assert!((marginals["a"][0] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_fit_rejects_unknown_state() {
        let a = Variable::new("A", StateSpec::labels(["x", "y"]), &[], TableSpec::Uniform).unwrap();
        let mut model = Network::new("Solo", vec![a]).unwrap();
        let data = DataTable::new(vec!["a".to_string()], vec![vec!["zz".to_string()]]);
        let err = model.fit(&data, None).unwrap_err();
        assert!(matches!(err, bnkit::BnError::Lookup(_)));
    }

    #[test]
    fn test_lookup_by_id() {
        let model = create_test_model();
        for id in model.variable_ids() {
            assert_eq!(model.lookup(&id).unwrap().id(), id);
        }
        assert!(model.lookup("missing").is_err());
    }
}

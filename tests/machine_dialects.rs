//! Dialect behaviour through the controller: tool words, variable
//! spellings and TOML machine descriptions.

use ncpath::{Controller, Dialect, ErrorKind};

#[test]
fn iso_turn_rejects_out_of_range_tool_numbers() {
    let mut control = Controller::new(1, Dialect::IsoTurn);
    let err = control.run_program("T10000\n", 1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::CodeError);
    assert!(
        err.message.contains("Tool number T10000 out of range"),
        "unexpected message: {err}"
    );
}

#[test]
fn iso_turn_accepts_the_tool_offset_split() {
    let mut control = Controller::new(1, Dialect::IsoTurn);
    control.run_program("T0101\n", 1).expect("T0101 is valid");
    let state = control.canal(1).unwrap().state();
    assert_eq!(state.extra.get("tool_number").map(String::as_str), Some("1"));
    assert_eq!(state.extra.get("tool_offset").map(String::as_str), Some("1"));
}

#[test]
fn siemens_mill_rejects_out_of_range_tool_numbers() {
    let mut control = Controller::new(1, Dialect::SiemensMill);
    let err = control.run_program("T10000\n", 1).unwrap_err();
    assert!(err.message.contains("Tool number T10000 out of range"));
    control.run_program("T100\n", 1).expect("T100 is valid");
}

#[test]
fn siemens_r_parameters_drive_motion() {
    let mut control = Controller::new(1, Dialect::SiemensMill);
    control
        .run_program("R1=10\nG0 X=R1\nT100\n", 1)
        .expect("run siemens program");
    assert_eq!(control.canal(1).unwrap().state().axis('X'), 10.0);
}

#[test]
fn hash_and_r_variables_share_a_namespace_without_colliding() {
    let mut control = Controller::new(1, Dialect::IsoTurn);
    control
        .run_program("#1=3\nR1=4\nG1 X#1 Y=R1 F100\n", 1)
        .expect("run");
    let state = control.canal(1).unwrap().state();
    assert_eq!(state.axis('X'), 3.0);
    assert_eq!(state.axis('Y'), 4.0);
}

#[test]
fn errors_carry_line_information_from_the_n_word() {
    let mut control = Controller::new(1, Dialect::IsoTurn);
    let err = control
        .run_program("N10 G0 X0\nN20 T10000\n", 1)
        .unwrap_err();
    assert_eq!(err.line, 20);
}

#[test]
fn error_log_accumulates_across_failed_runs() {
    let mut control = Controller::new(1, Dialect::IsoTurn);
    assert!(control.run_program("T10000\n", 1).is_err());
    assert!(control.run_program("G0 X#5\n", 1).is_err());
    assert_eq!(control.canal(1).unwrap().error_log().len(), 2);
}

#[test]
fn toml_machine_description_builds_a_working_controller() {
    let mut control = Controller::from_toml(
        r#"
        [meta]
        id = "demo-mill"
        name = "Demo 840D-style mill"
        description = "single canal, fine segmentation"

        [machine]
        dialect = "siemens_mill"
        canals = 1
        canal_names = ["MILL"]

        [motion]
        max_segment = 0.25
        rapid_rate = 20000.0
        "#,
    )
    .expect("build from toml");

    assert_eq!(control.canal_name(1), "MILL");
    control
        .run_program("G1 X10 F600\n", 1)
        .expect("run on configured canal");
    // 10 units at a 0.25 cap → 40 chords.
    assert_eq!(control.tool_path(1)[0].points.len(), 40);
}

#[test]
fn structured_errors_serialize_for_embedding_applications() {
    let mut control = Controller::new(1, Dialect::IsoTurn);
    let err = control.run_program("N20 T10000\n", 1).unwrap_err();
    let payload = serde_json::to_value(&err).expect("serialize error");
    assert_eq!(payload["kind"], "code_error");
    assert_eq!(payload["line"], 20);
    assert!(payload["message"]
        .as_str()
        .unwrap()
        .contains("out of range"));
}

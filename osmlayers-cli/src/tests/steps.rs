//! Behaviour-driven step definitions driving the extract CLI scenarios.

use super::helpers::{RunDirectories, layer_names, parse_extract};
use super::*;
use crate::extract::{ExtractConfig, RunMode};
use osmlayers_core::CATALOG;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::num::NonZeroUsize;

/// Extract CLI scenario state shared across steps.
struct ExtractWorld {
    directories: RunDirectories,
    cli_args: RefCell<Vec<String>>,
    cli_result: RefCell<Option<Result<ExtractConfig, CliError>>>,
}

impl ExtractWorld {
    fn new() -> Self {
        Self {
            directories: RunDirectories::new(),
            cli_args: RefCell::new(Vec::new()),
            cli_result: RefCell::new(None),
        }
    }

    fn push_args<I>(&self, args: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.cli_args.borrow_mut().extend(args);
    }

    fn directory_flags(&self, separator: char) -> Vec<String> {
        let flag = |name: &str| format!("--{}", name.replace('-', &separator.to_string()));
        let dirs = &self.directories;
        vec![
            flag(ARG_GEOJSON_DIR),
            dirs.geojson().display().to_string(),
            flag(ARG_LOG_DIR),
            dirs.logs().display().to_string(),
            flag(ARG_OUTPUT_PATH),
            dirs.output().display().to_string(),
        ]
    }

    fn config(&self) -> ExtractConfig {
        let borrowed = self.cli_result.borrow();
        match borrowed.as_ref().expect("result recorded") {
            Ok(config) => config.clone(),
            Err(err) => panic!("expected success, got {err}"),
        }
    }

    fn error(&self) -> CliError {
        self.cli_result
            .borrow_mut()
            .take()
            .expect("result recorded")
            .expect_err("expected error")
    }
}

#[fixture]
fn world() -> ExtractWorld {
    ExtractWorld::new()
}

#[given("boundary, log and output directories exist")]
fn directories_exist(#[from(world)] world: &ExtractWorld) {
    let dirs = &world.directories;
    for path in [dirs.geojson(), dirs.logs(), dirs.output()] {
        assert!(path.is_dir(), "expected {} to exist", path.display());
    }
}

#[given("I pass the directories with CLI flags")]
fn cli_flags(#[from(world)] world: &ExtractWorld) {
    world.push_args(world.directory_flags('-'));
}

#[given("I pass the directories with underscore flag aliases")]
fn underscore_flags(#[from(world)] world: &ExtractWorld) {
    world.push_args(world.directory_flags('_'));
}

#[given("I pass only the boundary and log directories")]
fn without_output(#[from(world)] world: &ExtractWorld) {
    let mut flags = world.directory_flags('-');
    flags.truncate(4);
    world.push_args(flags);
}

#[given("I request the dam and bank layers")]
fn request_dam_and_bank(#[from(world)] world: &ExtractWorld) {
    world.push_args(["--layer", "dam", "--layer", "bank", "--layer", "dam"].map(str::to_owned));
}

#[given("I request the piers layer")]
fn request_piers(#[from(world)] world: &ExtractWorld) {
    world.push_args(["--layer", "piers"].map(str::to_owned));
}

#[given("I enable parallel mode with 3 workers")]
fn parallel_three(#[from(world)] world: &ExtractWorld) {
    world.push_args(["--parallel", "--workers", "3"].map(str::to_owned));
}

#[when("I configure the extract command")]
fn configure_extract(#[from(world)] world: &ExtractWorld) {
    let args = world.cli_args.borrow().clone();
    world.cli_result.replace(Some(parse_extract(&args)));
}

#[then("the extract plan uses the CLI-provided directories")]
fn plan_uses_cli_directories(#[from(world)] world: &ExtractWorld) {
    let config = world.config();
    let dirs = &world.directories;
    assert_eq!(config.geojson_dir, dirs.geojson());
    assert_eq!(config.log_dir, dirs.logs());
    assert_eq!(config.output_path, dirs.output());
    config.validate_sources().expect("directories are valid");
}

#[then("the extract plan runs every catalogued layer sequentially")]
fn plan_runs_catalog(#[from(world)] world: &ExtractWorld) {
    let config = world.config();
    assert_eq!(config.mode, RunMode::Sequential);
    assert_eq!(config.layers.len(), CATALOG.len());
}

#[then("the CLI reports that the \"output-path\" flag is missing")]
fn reports_missing_output(#[from(world)] world: &ExtractWorld) {
    match world.error() {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_OUTPUT_PATH);
            assert_eq!(env, ENV_OUTPUT_PATH);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("the extract plan runs only the dam and bank layers")]
fn plan_runs_dam_and_bank(#[from(world)] world: &ExtractWorld) {
    assert_eq!(layer_names(&world.config()), ["dam", "bank"]);
}

#[then("the CLI reports the unknown layer \"piers\"")]
fn reports_unknown_layer(#[from(world)] world: &ExtractWorld) {
    match world.error() {
        CliError::UnknownLayer { name } => assert_eq!(name, "piers"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("the extract plan dispatches layers to 3 worker processes")]
fn plan_is_parallel(#[from(world)] world: &ExtractWorld) {
    let workers = NonZeroUsize::new(3).expect("non-zero");
    assert_eq!(world.config().mode, RunMode::Parallel { workers });
}

macro_rules! register_extract_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/extract_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ExtractWorld) {
            let _ = world;
        }
    };
}

register_extract_scenario!(cli_flag_selection, "selecting directories via CLI flags");
register_extract_scenario!(underscore_aliases, "accepting underscore flag aliases");
register_extract_scenario!(rejecting_missing_output, "rejecting a missing output path");
register_extract_scenario!(named_layers, "restricting the run to named layers");
register_extract_scenario!(unknown_layer, "rejecting an unknown layer");
register_extract_scenario!(parallel_mode, "enabling parallel mode");

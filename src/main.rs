use clap::Parser;
use recipe_schema::utils::{logger, validation::Validate};
use recipe_schema::{
    CliConfig, DocumentSource, GenericRecipe, LocalDocuments, Recipe, RecipeError, ResourceId,
    SchemaFile,
};

fn run(config: &CliConfig) -> recipe_schema::Result<serde_json::Value> {
    let schemas = SchemaFile::from_file(&config.schemas)?.build_schemas(config.flags())?;

    let type_id = ResourceId::parse(&config.recipe_type)?;
    let schema = schemas
        .get(&type_id)
        .ok_or_else(|| RecipeError::ConfigValidationError {
            field: "type".to_string(),
            message: format!("No schema declared for {}", type_id),
        })?;

    let recipe = match (config.constructor_args()?, &config.input) {
        (Some(args), _) => {
            tracing::debug!("Constructing {} from {} arguments", type_id, args.len());
            schema.construct(type_id, args)?
        }
        (None, Some(input)) => {
            let id = config.id.as_deref().map(ResourceId::parse).transpose()?;
            let document = LocalDocuments::new(".".to_string()).read_document(input)?;
            tracing::debug!("Deserializing {} from {}", type_id, input);
            schema.deserialize(type_id, id, document)?
        }
        (None, None) => {
            return Err(RecipeError::MissingConfigError {
                field: "input".to_string(),
            })
        }
    };

    let mut recipe = recipe
        .as_any()
        .downcast_ref::<GenericRecipe>()
        .cloned()
        .ok_or_else(|| RecipeError::InvalidDocument {
            message: "schema produced an unexpected recipe type".to_string(),
        })?;

    if let Some(original) = &recipe.header().original_json {
        tracing::debug!("Original document: {}", original);
    }

    Ok(recipe.serialize()?.clone())
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting recipe-schema CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    match run(&config) {
        Ok(document) => {
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Err(e) => {
            tracing::error!("❌ Recipe build failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

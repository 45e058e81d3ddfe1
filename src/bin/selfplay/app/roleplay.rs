use std::path::Path;

use selfplay::roleplay::{RolePlay, TemplateCatalog};
use tokio::sync::mpsc;

use crate::args::{CliArgs, RoleplayArgs, TemplatesArgs};
use crate::config::AppConfig;
use crate::provider::build_provider;

fn catalog(extra: Option<&Path>) -> anyhow::Result<TemplateCatalog> {
    let mut catalog = TemplateCatalog::builtin();
    if let Some(path) = extra {
        catalog.merge(TemplateCatalog::load_yaml(path)?);
    }
    Ok(catalog)
}

pub fn list(args: &TemplatesArgs) -> anyhow::Result<()> {
    for template in catalog(args.templates_file.as_deref())?.templates() {
        println!("{}\n    {}", template.name, template.description);
    }
    Ok(())
}

pub async fn run(args: &CliArgs, config: &AppConfig, play: &RoleplayArgs) -> anyhow::Result<()> {
    let catalog = catalog(play.templates_file.as_deref())?;
    let template = catalog.find(&play.template)?;

    let provider_a = build_provider(args.provider.as_deref(), args.model.as_deref(), config)?;
    let provider_b = match play.provider_b.as_deref() {
        Some(selection) => build_provider(Some(selection), None, config)?,
        None => build_provider(args.provider.as_deref(), args.model.as_deref(), config)?,
    };

    let mut session = RolePlay::new(template, provider_a, provider_b)?.with_config(
        super::interaction_config(&config.interaction, &play.interaction, args.delay_ms),
    );
    if let Some(start) = &play.start {
        session = session.with_start_message(start);
    }

    let outcome = if play.output.print_json {
        session.run().await?
    } else {
        println!("{}\n{}\n", template.name, template.description);
        let (sender, receiver) = mpsc::unbounded_channel();
        let printer = super::print_events(receiver);
        let outcome = session.run_with_events(sender).await?;
        printer.await?;
        outcome
    };

    super::write_outputs(
        outcome.transcript.as_slice(),
        session.participants(),
        &play.output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_templates_join_the_builtin_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.yaml");
        std::fs::write(
            &path,
            r#"
- name: "Barista | Customer"
  description: "Ordering coffee."
  roles: ["Barista", "Customer"]
  start: "Hi, what can I get you?"
  system_messages:
    Barista: "You are a friendly barista."
    Customer: "You are a customer who cannot decide."
"#,
        )
        .unwrap();

        let merged = catalog(Some(&path)).unwrap();
        assert_eq!(merged.len(), TemplateCatalog::builtin().len() + 1);
        assert!(merged.find("barista | customer").is_ok());
    }
}

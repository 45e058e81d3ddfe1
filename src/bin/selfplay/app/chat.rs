use selfplay::{Chatbot, InteractionLoop};
use tokio::sync::mpsc;

use crate::args::{ChatArgs, CliArgs};
use crate::config::AppConfig;
use crate::provider::build_provider;

pub async fn run(args: &CliArgs, config: &AppConfig, chat: &ChatArgs) -> anyhow::Result<()> {
    let provider_a = build_provider(args.provider.as_deref(), args.model.as_deref(), config)?;
    // --model targets the first bot when the second names its own provider.
    let provider_b = match chat.provider_b.as_deref() {
        Some(selection) => build_provider(Some(selection), None, config)?,
        None => build_provider(args.provider.as_deref(), args.model.as_deref(), config)?,
    };

    let mut bot_a = Chatbot::new(&chat.name_a, &chat.system_a, provider_a);
    let mut bot_b = Chatbot::new(&chat.name_b, &chat.system_b, provider_b);

    let mut runner = InteractionLoop::new(super::interaction_config(
        &config.interaction,
        &chat.interaction,
        args.delay_ms,
    ))?;
    let printer = if chat.output.print_json {
        None
    } else {
        let (sender, receiver) = mpsc::unbounded_channel();
        runner.set_event_sender(sender);
        Some(super::print_events(receiver))
    };

    let outcome = runner.run(&mut bot_a, &mut bot_b, &chat.start).await;
    drop(runner);
    if let Some(printer) = printer {
        printer.await?;
    }

    super::write_outputs(
        outcome.transcript.as_slice(),
        vec![bot_a.participant(), bot_b.participant()],
        &chat.output,
    )
}

//! Interactive chat shell
//!
//! Logged out, each line is taken as a user name. Once a session is
//! active, each line is a question and the conversation is shown most
//! recent first.

use historia_core::{ChatService, ConversationHistory, Llm, Role, SessionController};
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, EditCommand, Emacs, KeyCode, KeyModifiers,
    Keybindings, MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use std::borrow::Cow;
use tracing::info;

/// Name of the completion menu for slash commands
const COMMAND_MENU: &str = "command_menu";

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Mostrar la ayuda"),
    ("/history", "Mostrar el historial de conversación"),
    ("/llm", "Ver o elegir el modelo (antes de iniciar sesión)"),
    ("/logout", "Salir del chat y volver al inicio"),
    ("/exit", "Cerrar el programa"),
    ("/quit", "Cerrar el programa"),
];

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Prompt showing who is logged in
struct ChatPrompt {
    label: String,
    style: Style,
}

impl ChatPrompt {
    fn logged_out() -> Self {
        Self {
            label: "Nombre de usuario".to_string(),
            style: Color::Yellow.bold(),
        }
    }

    fn active(user_name: &str) -> Self {
        Self {
            label: user_name.to_string(),
            style: Color::Cyan.bold(),
        }
    }
}

impl Prompt for ChatPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(self.style.paint(format!("{}> ", self.label)).to_string())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

/// CLI options resolved from configuration and arguments
pub struct CliOptions {
    /// Model for the next session
    pub llm: Llm,
    /// Log in with this name on startup
    pub user: Option<String>,
}

/// Slash commands
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    History,
    Llm(Option<String>),
    Logout,
    Exit,
    Unknown(String),
}

/// One line of operator input
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Text(String),
}

/// Whether the loop keeps reading input
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Lines starting with '/' are commands; a leading "//" sends the rest
/// as text with a single '/'.
fn parse_input(line: &str) -> Input {
    if let Some(rest) = line.trim_start().strip_prefix("//") {
        return Input::Text(format!("/{}", rest));
    }

    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Input::Text(line.to_string());
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let command = match name.as_str() {
        "/help" | "/?" => Command::Help,
        "/history" => Command::History,
        "/llm" => Command::Llm(arg),
        "/logout" => Command::Logout,
        "/exit" | "/quit" | "/q" => Command::Exit,
        _ => Command::Unknown(trimmed.to_string()),
    };
    Input::Command(command)
}

/// Shell state around the controller
struct Shell<S> {
    controller: SessionController<S>,
    /// Model used for the next `start_session`
    llm: Llm,
}

impl<S: ChatService> Shell<S> {
    async fn handle_line(&mut self, line: &str) -> Flow {
        match parse_input(line) {
            Input::Command(command) => self.handle_command(command),
            Input::Text(text) if self.controller.is_active() => {
                self.ask(&text).await;
                Flow::Continue
            }
            Input::Text(text) => {
                self.login(&text).await;
                Flow::Continue
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Help => print_help(),
            Command::History => match self.controller.history() {
                Some(history) => print_history(history),
                None => println!("\nInicie sesión para ver el historial.\n"),
            },
            Command::Llm(choice) => self.choose_llm(choice),
            Command::Logout => self.logout(),
            Command::Exit => {
                println!("\n👋 ¡Hasta luego!\n");
                return Flow::Exit;
            }
            Command::Unknown(input) => {
                eprintln!(
                    "\n❓ Comando desconocido: {}. Use /help para ver los comandos.\n",
                    input
                );
            }
        }
        Flow::Continue
    }

    fn choose_llm(&mut self, choice: Option<String>) {
        if let Some(session) = self.controller.session() {
            // The model is fixed once the session has started
            println!("\nModelo de la sesión: {}\n", session.llm());
            if choice.is_some() {
                eprintln!("⚠️ Salga del chat (/logout) para cambiar de modelo.\n");
            }
            return;
        }

        match choice.map(|c| c.parse::<Llm>()) {
            None => println!("\nModelo: {}\n", self.llm),
            Some(Ok(llm)) => {
                self.llm = llm;
                println!("\n✅ Modelo seleccionado: {}\n", llm);
            }
            Some(Err(e)) => eprintln!("\n❌ {}\n", e),
        }
    }

    async fn login(&mut self, user_name: &str) {
        match self.controller.start_session(user_name, self.llm).await {
            Ok(started) => {
                info!("Logged in with thread {}", started.thread_id);
                if let Some(e) = started.history_error {
                    eprintln!("\n⚠️ {}\n", e);
                }
                self.print_chat();
            }
            Err(e) => eprintln!("\n❌ {}\n", e),
        }
    }

    async fn ask(&mut self, question: &str) {
        match self.controller.send_message(question).await {
            Ok(Some(_)) => {
                if let Some(history) = self.controller.history() {
                    print_history(history);
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("\n❌ {}\n", e),
        }
    }

    fn logout(&mut self) {
        if self.controller.is_active() {
            self.controller.end_session();
            println!("\n👋 Sesión cerrada.\n");
        } else {
            println!("\nNo hay una sesión activa.\n");
        }
    }

    fn print_chat(&self) {
        if let Some(session) = self.controller.session() {
            println!();
            println!("{}", Style::new().bold().paint(chat_header(session.user_name())));
            print_history(session.history());
        }
    }
}

/// Run CLI interactive mode
pub async fn run_cli<S: ChatService>(
    controller: SessionController<S>,
    options: CliOptions,
) -> anyhow::Result<()> {
    let mut shell = Shell {
        controller,
        llm: options.llm,
    };

    print_welcome();

    if let Some(user) = options.user {
        shell.login(&user).await;
    }

    let mut line_editor = create_line_editor();

    loop {
        let prompt = match shell.controller.session() {
            Some(session) => ChatPrompt::active(session.user_name()),
            None => ChatPrompt::logged_out(),
        };

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                if shell.handle_line(&line).await == Flow::Exit {
                    break;
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => {
                if shell.controller.is_active() {
                    shell.logout();
                } else {
                    println!("\n👋 ¡Hasta luego!\n");
                    break;
                }
            }
            Err(err) => {
                eprintln!("\n❌ Error: {}\n", err);
                break;
            }
        }
    }

    Ok(())
}

fn create_line_editor() -> Reedline {
    let menu = Box::new(
        ColumnarMenu::default()
            .with_name(COMMAND_MENU)
            .with_columns(1)
            .with_column_width(Some(50))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(chat_keybindings())))
}

/// Keybindings used by the chat prompt
fn chat_keybindings() -> Keybindings {
    let mut keybindings = default_keybindings();

    // '/' is typed as usual and also opens the command menu
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Multiple(vec![
            ReedlineEvent::Edit(vec![EditCommand::InsertChar('/')]),
            ReedlineEvent::Menu(COMMAND_MENU.to_string()),
        ]),
    );

    keybindings
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu(COMMAND_MENU.to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

fn chat_header(user_name: &str) -> String {
    format!("Chat - Usuario: {}", user_name)
}

fn print_history(history: &ConversationHistory) {
    println!();
    println!("📜 Historial de Conversación ({} mensajes):", history.len());
    println!("{}", "─".repeat(50));

    for message in history {
        let style = match message.role {
            Role::User => Color::Green.bold(),
            Role::Assistant => Color::Cyan.bold(),
        };
        println!(
            "{} {}",
            style.paint(format!("{}:", message.label())),
            message.content
        );
    }

    println!("{}", "─".repeat(50));
    println!();
}

fn print_welcome() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          💬 Chat Conversacional con Historial              ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Ingrese su nombre de usuario para iniciar el chat         ║");
    println!("║  Comandos: /help, /history, /llm, /logout, /exit           ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_help() {
    println!();
    println!("📖 Comandos disponibles:");
    for (cmd, desc) in COMMANDS {
        println!("  {} - {}", cmd, desc);
    }
    println!();
    println!("💡 Sin sesión, cada línea es un nombre de usuario; con sesión, una pregunta.");
    println!("💡 Para enviar un texto que empieza con '/', escriba '//' (por ejemplo //tmp).");
    println!("💡 Ctrl-D cierra la sesión activa, o el programa si no hay sesión.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use historia_core::{Error, Message, Operation, Result};
    use crossterm::event::{Event, KeyEvent};
    use reedline::{EditMode, ReedlineRawEvent};
    use std::sync::Mutex;

    /// Answers every question by echoing it; fails questions starting with "!"
    #[derive(Default)]
    struct EchoService {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatService for EchoService {
        async fn start_chat(&self, user_name: &str, _llm: Llm) -> Result<String> {
            Ok(format!("thread-{}", user_name))
        }

        async fn send_message(&self, _user_name: &str, question: &str, _llm: Llm) -> Result<String> {
            self.sent.lock().unwrap().push(question.to_string());
            match question.strip_prefix('!') {
                Some(_) => Err(Error::Remote {
                    operation: Operation::SendMessage,
                    detail: "boom".to_string(),
                }),
                None => Ok(format!("eco: {}", question)),
            }
        }

        async fn fetch_history(&self, _user_name: &str, _llm: Llm) -> Result<Vec<Message>> {
            Ok(vec![Message::user("hola")])
        }
    }

    fn shell() -> Shell<EchoService> {
        Shell {
            controller: SessionController::new(EchoService::default()),
            llm: Llm::OpenAi,
        }
    }

    #[test]
    fn test_parse_input_text() {
        assert_eq!(parse_input("hola"), Input::Text("hola".to_string()));
        // Questions are passed on as typed
        assert_eq!(parse_input("  hola "), Input::Text("  hola ".to_string()));
    }

    #[test]
    fn test_parse_input_commands() {
        assert_eq!(parse_input("/help"), Input::Command(Command::Help));
        assert_eq!(parse_input(" /HISTORY "), Input::Command(Command::History));
        assert_eq!(parse_input("/quit"), Input::Command(Command::Exit));
        assert_eq!(parse_input("/logout"), Input::Command(Command::Logout));
        assert_eq!(parse_input("/llm"), Input::Command(Command::Llm(None)));
        assert_eq!(
            parse_input("/llm  DeepSeek "),
            Input::Command(Command::Llm(Some("DeepSeek".to_string())))
        );
        assert_eq!(
            parse_input("/nope"),
            Input::Command(Command::Unknown("/nope".to_string()))
        );
    }

    #[test]
    fn test_parse_input_double_slash_is_text() {
        assert_eq!(parse_input("//tmp"), Input::Text("/tmp".to_string()));
        assert_eq!(
            parse_input("  //logout ahora"),
            Input::Text("/logout ahora".to_string())
        );
    }

    fn key_event(code: KeyCode) -> ReedlineEvent {
        let event = Event::Key(KeyEvent::new(code, KeyModifiers::NONE));
        let raw = ReedlineRawEvent::try_from(event).unwrap();
        Emacs::new(chat_keybindings()).parse_event(raw)
    }

    fn inserted_chars(event: ReedlineEvent) -> Vec<char> {
        match event {
            ReedlineEvent::Edit(commands) => commands
                .into_iter()
                .filter_map(|command| match command {
                    EditCommand::InsertChar(c) => Some(c),
                    _ => None,
                })
                .collect(),
            ReedlineEvent::Multiple(events) => events.into_iter().flat_map(inserted_chars).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_slash_key_is_inserted_and_opens_menu() {
        assert_eq!(
            key_event(KeyCode::Char('/')),
            ReedlineEvent::Multiple(vec![
                ReedlineEvent::Edit(vec![EditCommand::InsertChar('/')]),
                ReedlineEvent::Menu(COMMAND_MENU.to_string()),
            ])
        );
    }

    #[test]
    fn test_plain_keys_are_inserted() {
        assert_eq!(
            key_event(KeyCode::Char('l')),
            ReedlineEvent::Edit(vec![EditCommand::InsertChar('l')])
        );
    }

    #[tokio::test]
    async fn test_typed_logout_command_does_not_reach_service() {
        let mut shell = shell();
        shell.handle_line("Ana").await;

        // Same line the editor produces for the keystrokes "/logout"
        let line: String = "/logout"
            .chars()
            .flat_map(|c| inserted_chars(key_event(KeyCode::Char(c))))
            .collect();
        assert_eq!(line, "/logout");

        shell.handle_line(&line).await;

        assert!(!shell.controller.is_active());
        assert!(shell.controller.service().sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_completer_suggests_matching_commands() {
        let mut completer = CommandCompleter::new();
        let suggestions = completer.complete("/l", 2);
        let values: Vec<&str> = suggestions.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["/llm", "/logout"]);
        assert!(completer.complete("hola", 4).is_empty());
    }

    #[test]
    fn test_chat_header() {
        assert_eq!(chat_header("Ana"), "Chat - Usuario: Ana");
    }

    #[tokio::test]
    async fn test_first_line_logs_in_then_lines_are_questions() {
        let mut shell = shell();

        assert_eq!(shell.handle_line("Ana").await, Flow::Continue);
        let session = shell.controller.session().unwrap();
        assert_eq!(session.user_name(), "Ana");
        assert_eq!(session.thread_id(), "thread-Ana");

        shell.handle_line("¿cómo estás?").await;

        assert_eq!(
            shell.controller.history().unwrap().as_slice(),
            &[
                Message::assistant("eco: ¿cómo estás?"),
                Message::user("¿cómo estás?"),
                Message::user("hola"),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_login_stays_logged_out() {
        let mut shell = shell();

        shell.handle_line("   ").await;

        assert!(!shell.controller.is_active());
    }

    #[tokio::test]
    async fn test_failed_question_keeps_history() {
        let mut shell = shell();
        shell.handle_line("Ana").await;
        let before = shell.controller.history().unwrap().clone();

        shell.handle_line("!falla").await;
        shell.handle_line("   ").await;

        assert_eq!(shell.controller.history().unwrap(), &before);
        assert_eq!(
            *shell.controller.service().sent.lock().unwrap(),
            vec!["!falla".to_string()]
        );
    }

    #[tokio::test]
    async fn test_logout_and_exit() {
        let mut shell = shell();
        shell.handle_line("Ana").await;

        assert_eq!(shell.handle_line("/logout").await, Flow::Continue);
        assert!(!shell.controller.is_active());

        assert_eq!(shell.handle_line("/exit").await, Flow::Exit);
    }

    #[tokio::test]
    async fn test_llm_only_changes_while_logged_out() {
        let mut shell = shell();

        shell.handle_line("/llm deepseek").await;
        assert_eq!(shell.llm, Llm::DeepSeek);

        shell.handle_line("/llm gemini").await;
        assert_eq!(shell.llm, Llm::DeepSeek);

        shell.handle_line("Ana").await;
        shell.handle_line("/llm openai").await;
        assert_eq!(shell.llm, Llm::DeepSeek);
        assert_eq!(shell.controller.session().unwrap().llm(), Llm::DeepSeek);
    }
}

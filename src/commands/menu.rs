use super::merge::{merge_files, MergeOptions};
use crate::{
    cli::MenuArgs,
    io::{discovery::find_source_files, readers::ReaderRegistry, tsv_writer::WriterRegistry},
    utils::util::Result,
};
use std::{
    io::{self, BufRead, IsTerminal, Write},
    path::PathBuf,
};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// What the user has selected so far.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub directory: Option<PathBuf>,
    /// Source files of `directory`; `None` until a directory with sources is chosen.
    pub files: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    SelectDirectory,
    Merge,
    Exit,
}

impl MenuOption {
    fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(Self::SelectDirectory),
            2 => Some(Self::Merge),
            3 => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Continue or stop the menu loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub fn menu(args: MenuArgs) -> Result<()> {
    let options = args.output.merge_options()?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let clear_screen = stdout.is_terminal();
    let mut menu = Menu::new(stdin.lock(), stdout.lock(), options, args.default_dir)
        .with_clear_screen(clear_screen);
    menu.run()
}

/// Line-oriented text menu. End of input is treated like answering "no".
pub struct Menu<R, W> {
    input: R,
    output: W,
    options: MergeOptions,
    default_dir: PathBuf,
    readers: ReaderRegistry,
    writers: WriterRegistry,
    state: MenuState,
    clear_screen: bool,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, options: MergeOptions, default_dir: PathBuf) -> Self {
        Self {
            input,
            output,
            options,
            default_dir,
            readers: ReaderRegistry::default(),
            writers: WriterRegistry::default(),
            state: MenuState::default(),
            clear_screen: false,
        }
    }

    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until the user exits. Only integrity errors of a merge escape.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.clear()?;
            self.show_menu()?;
            let Some(option) = self.read_option()? else {
                return self.farewell();
            };
            log::debug!("Menu option selected: {:?}", option);

            self.clear()?;
            let flow = match option {
                MenuOption::SelectDirectory => self.select_directory()?,
                MenuOption::Merge => self.merge_selected()?,
                MenuOption::Exit => Flow::Exit,
            };
            if flow == Flow::Exit {
                return self.farewell();
            }

            if !self.confirm("\nDo you want to return to the menu? (y/n: another key): ")? {
                return self.farewell();
            }
        }
    }

    fn show_menu(&mut self) -> Result<()> {
        writeln!(self.output, "\n\t\t-tabmerge-\n")?;
        writeln!(self.output, "1. Select the data directory.")?;
        writeln!(self.output, "2. Sort the data of the files.")?;
        writeln!(self.output, "3. Exit.")?;
        Ok(())
    }

    fn farewell(&mut self) -> Result<()> {
        writeln!(self.output, "\nThanks for using tabmerge.")?;
        self.output.flush()?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.clear_screen {
            write!(self.output, "{CLEAR_SCREEN}")?;
        }
        Ok(())
    }

    /// Prompts and reads one trimmed line; `None` at end of input.
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn confirm(&mut self, text: &str) -> Result<bool> {
        Ok(self
            .prompt(text)?
            .is_some_and(|answer| answer.eq_ignore_ascii_case("y")))
    }

    fn read_option(&mut self) -> Result<Option<MenuOption>> {
        loop {
            let Some(answer) = self.prompt("\nChoose one of the options: ")? else {
                return Ok(None);
            };
            match answer.parse::<u32>() {
                Ok(number) => match MenuOption::from_number(number) {
                    Some(option) => return Ok(Some(option)),
                    None => writeln!(
                        self.output,
                        "Sorry, there's no option number {number}. Please try again."
                    )?,
                },
                Err(_) => writeln!(
                    self.output,
                    "You can only enter numbers between 1 and 3. Please try again."
                )?,
            }
        }
    }

    /// Asks for the source directory; `None` when the user gives up.
    fn ask_directory(&mut self) -> Result<Option<PathBuf>> {
        loop {
            if self.confirm("Do you want to use the files in 'data' directory? (y/n: another key): ")? {
                return Ok(Some(self.default_dir.clone()));
            }

            writeln!(
                self.output,
                "\n* NOTE: Please make sure to write the absolute path to the directory."
            )?;
            let Some(path) = self.prompt("Enter the path to the data files (to sort): ")? else {
                return Ok(None);
            };
            if path.contains(['/', '\\']) {
                return Ok(Some(PathBuf::from(path)));
            }

            writeln!(self.output, "\n* ERROR: The path is not valid.")?;
            if !self.confirm("Do you want to try again? (y/n: another key): ")? {
                return Ok(None);
            }
        }
    }

    fn select_directory(&mut self) -> Result<Flow> {
        let Some(directory) = self.ask_directory()? else {
            return Ok(Flow::Exit);
        };

        let files = match find_source_files(&directory) {
            Ok(files) => files,
            Err(error) => {
                log::error!("{error}");
                Vec::new()
            }
        };
        self.state.directory = Some(directory.clone());
        if files.is_empty() {
            self.state.files = None;
            writeln!(
                self.output,
                "There are no files with extension .csv, .json or .xml in '{}'.",
                directory.display()
            )?;
            return Ok(Flow::Continue);
        }

        log::info!(
            "Selected {} source files in {}",
            files.len(),
            directory.display()
        );
        self.state.files = Some(files);
        if self.confirm("\nContinue with the process of sorting? (y/n: another key): ")? {
            self.merge_selected()?;
        }
        Ok(Flow::Continue)
    }

    fn merge_selected(&mut self) -> Result<Flow> {
        let (Some(directory), Some(files)) = (&self.state.directory, &self.state.files) else {
            writeln!(self.output, "\nYou must select the directory first.")?;
            return Ok(Flow::Continue);
        };

        match merge_files(directory, files, &self.options, &self.readers, &self.writers) {
            Ok(summary) => writeln!(
                self.output,
                "\nThe data have been sorted and written in '{}'.",
                summary.output.display()
            )?,
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                log::error!("{error}");
                writeln!(self.output, "\n* ERROR: {error}")?;
            }
        }
        Ok(Flow::Continue)
    }
}

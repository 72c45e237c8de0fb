/// Identifies one in-flight turn so only its own settlement re-enables input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnTicket(pub u64);

/// Typed/spoken/form submission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Composing,
    Sending(TurnTicket),
}

/// Speech capture lifecycle, orthogonal to [`TurnPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    Unavailable,
    Idle,
    Capturing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTransition {
    /// The draft changed; `has_text` is whether it holds anything but whitespace.
    Edit { has_text: bool },
    BeginSend { has_text: bool },
    Settle(TurnTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Activate,
    CaptureStarted,
    CaptureEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRejection {
    EmptyInput,
    AlreadySending { active: TurnTicket },
    NotSending,
    TicketMismatch {
        active: TurnTicket,
        attempted: TurnTicket,
    },
    VoiceUnavailable,
    /// Voice controls are disabled while a turn is in flight.
    InputDisabled,
}

pub type InputTransitionResult<T> = Result<T, InputRejection>;

/// What the widget should do with the recognizer after a voice transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    Start,
    Stop,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMachine {
    turn: TurnPhase,
    voice: VoicePhase,
    next_ticket: u64,
}

impl InputMachine {
    pub fn new(voice_available: bool) -> Self {
        Self {
            turn: TurnPhase::Idle,
            voice: if voice_available {
                VoicePhase::Idle
            } else {
                VoicePhase::Unavailable
            },
            next_ticket: 1,
        }
    }

    pub fn turn_phase(&self) -> TurnPhase {
        self.turn
    }

    pub fn voice_phase(&self) -> VoicePhase {
        self.voice
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.turn, TurnPhase::Sending(_))
    }

    /// Applies one turn-path transition. `BeginSend` yields the new ticket.
    pub fn apply(&mut self, transition: InputTransition) -> InputTransitionResult<Option<TurnTicket>> {
        match transition {
            InputTransition::Edit { has_text } => {
                if let TurnPhase::Sending(active) = self.turn {
                    return Err(InputRejection::AlreadySending { active });
                }
                self.turn = if has_text {
                    TurnPhase::Composing
                } else {
                    TurnPhase::Idle
                };
                Ok(None)
            }
            InputTransition::BeginSend { has_text } => self.begin_send(has_text).map(Some),
            InputTransition::Settle(ticket) => self.settle(ticket).map(|()| None),
        }
    }

    fn begin_send(&mut self, has_text: bool) -> InputTransitionResult<TurnTicket> {
        if let TurnPhase::Sending(active) = self.turn {
            return Err(InputRejection::AlreadySending { active });
        }
        if !has_text {
            return Err(InputRejection::EmptyInput);
        }

        let ticket = TurnTicket(self.next_ticket);
        self.next_ticket += 1;
        self.turn = TurnPhase::Sending(ticket);
        Ok(ticket)
    }

    fn settle(&mut self, ticket: TurnTicket) -> InputTransitionResult<()> {
        match self.turn {
            TurnPhase::Sending(active) if active == ticket => {
                self.turn = TurnPhase::Idle;
                Ok(())
            }
            TurnPhase::Sending(active) => Err(InputRejection::TicketMismatch {
                active,
                attempted: ticket,
            }),
            TurnPhase::Idle | TurnPhase::Composing => Err(InputRejection::NotSending),
        }
    }

    /// Applies one voice-path transition and says what to do with the recognizer.
    pub fn apply_voice(&mut self, transition: VoiceTransition) -> InputTransitionResult<VoiceCommand> {
        if self.voice == VoicePhase::Unavailable {
            return Err(InputRejection::VoiceUnavailable);
        }

        match transition {
            VoiceTransition::Activate => {
                if self.is_sending() {
                    return Err(InputRejection::InputDisabled);
                }
                match self.voice {
                    VoicePhase::Idle => {
                        self.voice = VoicePhase::Capturing;
                        Ok(VoiceCommand::Start)
                    }
                    VoicePhase::Capturing => Ok(VoiceCommand::Stop),
                    VoicePhase::Unavailable => Err(InputRejection::VoiceUnavailable),
                }
            }
            VoiceTransition::CaptureStarted => {
                self.voice = VoicePhase::Capturing;
                Ok(VoiceCommand::None)
            }
            VoiceTransition::CaptureEnded => {
                self.voice = VoicePhase::Idle;
                Ok(VoiceCommand::None)
            }
        }
    }
}

/// Enter submits; Shift+Enter continues the line.
pub fn is_submit_key(key: &str, shift: bool) -> bool {
    key == "Enter" && !shift
}

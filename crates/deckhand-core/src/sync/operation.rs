use std::fmt;

/// Document operations driven by the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    AddSlide,
    DeleteSlide,
    ReorderSlides,
    UpdateSlide,
    Rename,
    AddElement,
    UpdateElement,
    DeleteElement,
    UploadMedia,
}

impl Operation {
    /// Message shown after the server confirmed the change
    ///
    /// Element operations are frequent (every drag or keystroke) and stay
    /// silent on success.
    pub fn success_message(self) -> Option<&'static str> {
        match self {
            Operation::AddSlide => Some("Slide added"),
            Operation::DeleteSlide => Some("Slide deleted"),
            Operation::ReorderSlides => Some("Slide order saved"),
            Operation::UpdateSlide => Some("Slide updated"),
            Operation::Rename => Some("Presentation renamed"),
            Operation::Load
            | Operation::AddElement
            | Operation::UpdateElement
            | Operation::DeleteElement
            | Operation::UploadMedia => None,
        }
    }

    /// Message shown when the server gave no explanation
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Load => "Could not load presentation",
            Operation::AddSlide => "Could not add slide",
            Operation::DeleteSlide => "Could not delete slide",
            Operation::ReorderSlides => "Could not reorder slides",
            Operation::UpdateSlide => "Could not update slide",
            Operation::Rename => "Could not rename presentation",
            Operation::AddElement => "Could not add element",
            Operation::UpdateElement => "Error saving element",
            Operation::DeleteElement => "Could not delete element",
            Operation::UploadMedia => "Could not upload file",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Load => "load",
            Operation::AddSlide => "add slide",
            Operation::DeleteSlide => "delete slide",
            Operation::ReorderSlides => "reorder slides",
            Operation::UpdateSlide => "update slide",
            Operation::Rename => "rename",
            Operation::AddElement => "add element",
            Operation::UpdateElement => "update element",
            Operation::DeleteElement => "delete element",
            Operation::UploadMedia => "upload media",
        };
        write!(f, "{}", name)
    }
}

//! Form Controls
//!
//! Live state of input, select and textarea elements. This is the state
//! that changes without any attribute mutation: typing into a field,
//! toggling a checkbox, picking an option.

/// HTML input types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    Text,
    Password,
    Email,
    Number,
    Search,
    Tel,
    Url,
    Hidden,
    Checkbox,
    Radio,
    Range,
    Color,
    Date,
    Submit,
    Button,
}

impl InputType {
    /// Parse from string
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "password" => Self::Password,
            "email" => Self::Email,
            "number" => Self::Number,
            "search" => Self::Search,
            "tel" => Self::Tel,
            "url" => Self::Url,
            "hidden" => Self::Hidden,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "range" => Self::Range,
            "color" => Self::Color,
            "date" => Self::Date,
            "submit" => Self::Submit,
            "button" => Self::Button,
            _ => Self::Text,
        }
    }

    /// Checkbox or radio
    pub fn is_checkable(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio)
    }
}

/// Which kind of control an element is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Input(InputType),
    Select,
    TextArea,
}

/// Live control state
#[derive(Debug, Clone, PartialEq)]
pub struct FormControl {
    pub kind: ControlKind,
    /// Current value (input/textarea)
    pub value: String,
    /// Value from markup
    pub default_value: String,
    /// Checkedness (checkbox/radio)
    pub checked: bool,
    /// Selected option index, -1 for none (select)
    pub selected_index: i32,
    /// Value was changed by the user or script
    dirty_value: bool,
    /// Checkedness was changed by the user or script
    dirty_checked: bool,
}

impl FormControl {
    /// Control state for a tag, if the tag is a form control
    pub fn for_tag(tag_name: &str) -> Option<Self> {
        let kind = match tag_name {
            "input" => ControlKind::Input(InputType::Text),
            "select" => ControlKind::Select,
            "textarea" => ControlKind::TextArea,
            _ => return None,
        };
        Some(Self {
            kind,
            value: String::new(),
            default_value: String::new(),
            checked: false,
            selected_index: -1,
            dirty_value: false,
            dirty_checked: false,
        })
    }

    pub fn input_type(&self) -> Option<InputType> {
        match self.kind {
            ControlKind::Input(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_radio(&self) -> bool {
        self.input_type() == Some(InputType::Radio)
    }

    /// Markup attribute changed; non-dirty state follows its default
    pub fn attribute_changed(&mut self, name: &str, value: Option<&str>) {
        match (name, self.kind) {
            ("type", ControlKind::Input(_)) => {
                self.kind = ControlKind::Input(InputType::parse(value.unwrap_or("")));
            }
            ("value", ControlKind::Input(_)) => {
                self.default_value = value.unwrap_or("").to_string();
                if !self.dirty_value {
                    self.value = self.default_value.clone();
                }
            }
            ("checked", ControlKind::Input(_)) => {
                if !self.dirty_checked {
                    self.checked = value.is_some();
                }
            }
            _ => {}
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.dirty_value = true;
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
        self.dirty_checked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_parse() {
        assert_eq!(InputType::parse("CHECKBOX"), InputType::Checkbox);
        assert_eq!(InputType::parse("radio"), InputType::Radio);
        assert_eq!(InputType::parse("unknown"), InputType::Text);
        assert!(InputType::Radio.is_checkable());
    }

    #[test]
    fn test_default_value_follows_markup_until_dirty() {
        let mut control = FormControl::for_tag("input").unwrap();
        control.attribute_changed("value", Some("a"));
        assert_eq!(control.value, "a");

        control.set_value("typed");
        control.attribute_changed("value", Some("b"));
        assert_eq!(control.value, "typed");
        assert_eq!(control.default_value, "b");
    }

    #[test]
    fn test_checked_attribute() {
        let mut control = FormControl::for_tag("input").unwrap();
        control.attribute_changed("type", Some("checkbox"));
        control.attribute_changed("checked", Some(""));
        assert!(control.checked);
        control.set_checked(false);
        control.attribute_changed("checked", Some(""));
        assert!(!control.checked);
    }
}

//! Prompt templates
//!
//! The schema description and few-shot examples are immutable and shared by
//! every request; a `PromptEnvelope` renders them around one user question.

/// Description of the two analytics tables, in the language of the questions.
pub const SCHEMA_DESCRIPTION: &str = r#"СХЕМА БАЗЫ ДАННЫХ (PostgreSQL):

Таблица videos (итоговая статистика по видео):
- id (UUID) — идентификатор видео
- creator_id (UUID) — идентификатор креатора
- video_created_at (timestamp) — дата и время публикации видео
- views_count (integer) — финальное количество просмотров
- likes_count (integer) — финальное количество лайков
- comments_count (integer) — финальное количество комментариев
- reports_count (integer) — финальное количество жалоб
- created_at (timestamp) — служебное поле
- updated_at (timestamp) — служебное поле

Таблица video_snapshots (почасовые замеры по видео):
- id (integer) — идентификатор снапшота
- video_id (UUID) — ссылка на видео (videos.id)
- views_count, likes_count, comments_count, reports_count (integer) — значения на момент замера
- delta_views_count, delta_likes_count, delta_comments_count, delta_reports_count (integer) — приращение с прошлого замера
- created_at (timestamp) — время замера (раз в час)
- updated_at (timestamp) — служебное поле"#;

const GUIDELINES: &str = r#"ПРАВИЛА:
- Общее количество видео: SELECT COUNT(*) FROM videos;
- Итоговые просмотры/лайки/комментарии считай через SUM() по таблице videos
- Прирост считай через SUM(delta_*) по таблице video_snapshots
- Дату публикации фильтруй по videos.video_created_at, время замера по video_snapshots.created_at
- Конкретная дата: DATE(created_at) = 'YYYY-MM-DD'
- Диапазон включительно: created_at >= 'YYYY-MM-DD' AND created_at <= 'YYYY-MM-DD 23:59:59'
- UUID пиши в одинарных кавычках: 'aca1061a9d324ecf8c3fa2bb32d7be63'
- Числа пиши без пробелов: 100000, а не 100 000
- Месяцы: январь=01, февраль=02, март=03, апрель=04, май=05, июнь=06, июль=07, август=08, сентябрь=09, октябрь=10, ноябрь=11, декабрь=12
- Запрос должен возвращать одно число"#;

/// (question, sql) pairs shown to the model before the real question.
pub const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Сколько всего видео есть в системе?",
        "SELECT COUNT(*) FROM videos;",
    ),
    (
        "Сколько видео набрало больше 100000 просмотров за всё время?",
        "SELECT COUNT(*) FROM videos WHERE views_count > 100000;",
    ),
    (
        "На сколько просмотров в сумме выросли все видео 28 ноября 2025?",
        "SELECT COALESCE(SUM(delta_views_count), 0) FROM video_snapshots WHERE DATE(created_at) = '2025-11-28';",
    ),
    (
        "Сколько разных видео получали новые просмотры 27 ноября 2025?",
        "SELECT COUNT(DISTINCT video_id) FROM video_snapshots WHERE DATE(created_at) = '2025-11-27' AND delta_views_count > 0;",
    ),
    (
        "Сколько видео у креатора с id aca1061a9d324ecf8c3fa2bb32d7be63 вышло с 1 ноября 2025 по 5 ноября 2025 включительно?",
        "SELECT COUNT(*) FROM videos WHERE creator_id = 'aca1061a9d324ecf8c3fa2bb32d7be63' AND video_created_at >= '2025-11-01' AND video_created_at <= '2025-11-05 23:59:59';",
    ),
    (
        "Сколько видео у креатора с id aca1061a9d324ecf8c3fa2bb32d7be63 набрали больше 10000 просмотров по итоговой статистике?",
        "SELECT COUNT(*) FROM videos WHERE creator_id = 'aca1061a9d324ecf8c3fa2bb32d7be63' AND views_count > 10000;",
    ),
];

pub const VERDICT_VALID: &str = "VALID";
pub const VERDICT_REGENERATE: &str = "REGENERATE";

/// Prompts for one request: the question plus candidates already rejected
/// by the semantic check, which are fed back on regeneration.
#[derive(Debug, Clone)]
pub struct PromptEnvelope {
    user_query: String,
    rejected: Vec<String>,
}

impl PromptEnvelope {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            rejected: Vec::new(),
        }
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn reject(&mut self, sql: impl Into<String>) {
        self.rejected.push(sql.into());
    }

    /// Single-shot prompt: question in, `SQL:` answer out.
    pub fn direct_sql(&self) -> String {
        format!(
            "Ты — SQL-эксперт. Преобразуй вопрос пользователя в один SQL-запрос для PostgreSQL.\n\n{}\n\n{}\n\nПРИМЕРЫ:\n{}{}\nВопрос: \"{}\"\nSQL:",
            SCHEMA_DESCRIPTION,
            GUIDELINES,
            render_examples(),
            self.rejection_hint(),
            self.user_query
        )
    }

    /// First stage of the two-stage strategy: restate the question as a task.
    pub fn task_description(&self) -> String {
        format!(
            "Ты — аналитик данных. Опиши кратко, что нужно посчитать, чтобы ответить на вопрос: какие таблицы, какие поля, какие фильтры (даты переведи в формат YYYY-MM-DD) и какая агрегация. Не пиши SQL.\n\n{}\n\nВопрос: \"{}\"\nЗадача:",
            SCHEMA_DESCRIPTION, self.user_query
        )
    }

    /// Second stage of the two-stage strategy.
    pub fn sql_from_task(&self, task: &str) -> String {
        format!(
            "Ты — SQL-эксперт. Напиши один SQL-запрос для PostgreSQL по описанию задачи.\n\n{}\n\n{}\n\nПРИМЕРЫ:\n{}{}\nВопрос: \"{}\"\nЗадача: {}\nSQL:",
            SCHEMA_DESCRIPTION,
            GUIDELINES,
            render_examples(),
            self.rejection_hint(),
            self.user_query,
            task.trim()
        )
    }

    /// Yes/no judgment used by the semantic re-validator.
    pub fn judgment(&self, sql: &str) -> String {
        format!(
            "Проверь, отвечает ли SQL-запрос на вопрос пользователя.\n\n{}\n\nВопрос: \"{}\"\nSQL: {}\n\nЕсли запрос корректно отвечает на вопрос, ответь ровно {}. Если запрос нужно сгенерировать заново, ответь ровно {}. Больше ничего не пиши.",
            SCHEMA_DESCRIPTION, self.user_query, sql, VERDICT_VALID, VERDICT_REGENERATE
        )
    }

    fn rejection_hint(&self) -> String {
        if self.rejected.is_empty() {
            return String::new();
        }
        let mut hint = String::from("\nЭТИ ВАРИАНТЫ УЖЕ ПРИЗНАНЫ НЕВЕРНЫМИ, НЕ ПОВТОРЯЙ ИХ:\n");
        for sql in &self.rejected {
            hint.push_str("- ");
            hint.push_str(sql);
            hint.push('\n');
        }
        hint
    }
}

fn render_examples() -> String {
    FEW_SHOT_EXAMPLES
        .iter()
        .map(|(question, sql)| format!("Вопрос: \"{}\"\nSQL: {}\n", question, sql))
        .collect::<Vec<_>>()
        .join("\n")
}

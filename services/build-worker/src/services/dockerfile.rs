use super::detector::Framework;

/// The synthesized Dockerfile never shadows a file the repository ships.
pub const FILE_NAME: &str = "Dockerfile.dejavu";

/// Render the image recipe for a built workspace.
///
/// Base images, exposed ports and start commands are part of the user-facing
/// contract, so the templates stay byte-for-byte stable. Frameworks without a
/// dedicated recipe ship their `output_dir` behind nginx.
pub fn render(framework: Framework, output_dir: &str) -> String {
    match framework {
        Framework::NextJs => r#"FROM node:18-alpine
WORKDIR /app
COPY . .
RUN npm install
RUN npm run build
EXPOSE 3000
CMD ["npm", "start"]"#
            .to_string(),

        Framework::NodeJs => r#"FROM node:18-alpine
WORKDIR /app
COPY . .
RUN npm install
EXPOSE 3000
CMD ["node", "index.js"]"#
            .to_string(),

        Framework::Go => r#"FROM golang:1.21-alpine AS builder
WORKDIR /app
COPY . .
RUN go build -o main .

FROM alpine:latest
WORKDIR /app
COPY --from=builder /app/main .
EXPOSE 8080
CMD ["./main"]"#
            .to_string(),

        Framework::Php => r#"FROM php:8.2-apache
COPY . /var/www/html/
EXPOSE 80"#
            .to_string(),

        Framework::NuxtJs | Framework::Bun | Framework::Static => format!(
            r#"FROM nginx:alpine
COPY {output_dir} /usr/share/nginx/html
EXPOSE 80
CMD ["nginx", "-g", "daemon off;"]"#
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detector::detect;
    use std::fs;

    #[test]
    fn static_recipe_ships_the_output_dir_behind_nginx() {
        let recipe = render(Framework::Static, "dist");
        assert!(recipe.starts_with("FROM nginx:alpine"));
        assert!(recipe.contains("COPY dist /usr/share/nginx/html"));
        assert!(recipe.contains("EXPOSE 80"));
    }

    #[test]
    fn nextjs_recipe_serves_on_3000() {
        let recipe = render(Framework::NextJs, "dist");
        assert!(recipe.starts_with("FROM node:18-alpine"));
        assert!(recipe.contains("RUN npm run build"));
        assert!(recipe.contains("EXPOSE 3000"));
        assert!(recipe.contains(r#"CMD ["npm", "start"]"#));
    }

    #[test]
    fn go_recipe_is_multi_stage() {
        let recipe = render(Framework::Go, "dist");
        assert!(recipe.contains("FROM golang:1.21-alpine AS builder"));
        assert!(recipe.contains("FROM alpine:latest"));
        assert!(recipe.contains("EXPOSE 8080"));
    }

    #[test]
    fn frameworks_without_a_recipe_fall_back_to_nginx() {
        for framework in [Framework::NuxtJs, Framework::Bun] {
            let recipe = render(framework, "public");
            assert!(recipe.contains("COPY public /usr/share/nginx/html"), "{framework}");
        }
    }

    #[test]
    fn writing_the_recipe_does_not_change_detection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("next.config.js"), b"").unwrap();
        fs::write(dir.path().join("package.json"), b"{}").unwrap();

        let before = detect(dir.path());
        fs::write(dir.path().join(FILE_NAME), render(before, "dist")).unwrap();

        assert_eq!(detect(dir.path()), before);
    }
}
